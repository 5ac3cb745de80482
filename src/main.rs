#[tokio::main]
async fn main() -> std::process::ExitCode {
    match care_relay::run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("care-relay: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
