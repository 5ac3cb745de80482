use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::notify::DeliveryFailure;
use crate::pipeline::donors::{notify_donors, NotifyOutcome, NotifyRequest};

#[derive(Deserialize)]
pub struct NotifyDonorsRequest {
    pub blood_group: String,
    pub hospital: String,
    pub urgency: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum NotifyDonorsResponse {
    NoDonors {
        message: &'static str,
    },
    Sent {
        success: bool,
        sent_count: usize,
        failed_count: usize,
        failures: Vec<DeliveryFailure>,
    },
}

/// `POST /notify-donors`: push a blood request to every available donor
/// of the requested group.
pub async fn notify(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NotifyDonorsRequest>, JsonRejection>,
) -> Result<Json<NotifyDonorsResponse>, ApiError> {
    let push = ctx.push()?;
    let donors = ctx.donors()?;
    let Json(req) = payload?;

    let request = NotifyRequest {
        blood_group: &req.blood_group,
        hospital: &req.hospital,
        urgency: &req.urgency,
    };
    let outcome = notify_donors(donors.as_ref(), push.as_ref(), &request, &ctx.fanout).await?;

    Ok(Json(match outcome {
        NotifyOutcome::NoDonors => NotifyDonorsResponse::NoDonors {
            message: "No donors found",
        },
        NotifyOutcome::Delivered(report) => NotifyDonorsResponse::Sent {
            success: true,
            sent_count: report.sent_count,
            failed_count: report.failed_count,
            failures: report.failures,
        },
    }))
}
