//! `events/customer-login`: forwards the login event to a Slack webhook.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;

use super::utils::{check_missing_request_inputs, error_response, string_parameters};
use super::{ActionEnv, ActionParams, ActionResponse};
use crate::logging::ActionLogger;

pub const SLACK_WEBHOOK_PARAM: &str = "SLACK_WEBHOOK";

pub(super) fn customer_login(env: &ActionEnv, params: ActionParams) -> BoxFuture<'_, ActionResponse> {
    async move {
        let logger = ActionLogger::new("main", params.str("LOG_LEVEL"));
        logger.info("Calling the main action of customer-login");
        let described = string_parameters(&params);
        logger.debug(&described);

        if let Some(message) = check_missing_request_inputs(&params, &[], &[]) {
            return error_response(400, &message, &logger);
        }

        let Some(webhook) = params.str(SLACK_WEBHOOK_PARAM) else {
            logger.error("SLACK_WEBHOOK is not configured");
            return error_response(500, "server error", &logger);
        };

        let sent = env
            .http()
            .post(webhook)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "text": format!("Customer Login - {described}") }))
            .send()
            .await;

        match sent {
            Ok(res) if res.status().is_success() => {
                logger.info("200: successful request");
                ActionResponse::ok(json!({
                    "message": "Commerce event information sent successfully."
                }))
            }
            Ok(res) => error_response(
                res.status().as_u16(),
                "Something is wrong with your Slack webhook URL.",
                &logger,
            ),
            Err(e) => {
                logger.error(&e.to_string());
                error_response(500, "server error", &logger)
            }
        }
    }
    .boxed()
}
