//! Edge middleware.
//!
//! Every request passes through [`edge_guard`] before any route handler:
//! classify, record exactly one security event, then either hard-block,
//! tarpit with a decoy, reject over the rate limit, or forward.

use std::time::Instant;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, ContentType};
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, Next};
use actix_web::{web, Error, HttpResponse};
use log::{debug, error, info, warn};

use super::{EdgeState, ErrorBody};
use crate::core::{
    monitoring, Classification, EventCategory, RequestDescriptor, SecurityEventInput,
};
use crate::utils::{client_address, user_agent};

/// Security headers attached to every response
pub fn security_headers(content_security_policy: &str) -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::X_FRAME_OPTIONS, "DENY"))
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_XSS_PROTECTION, "1; mode=block"))
        .add((header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
        .add(("Permissions-Policy", "camera=(), microphone=(), geolocation=()"))
        .add((header::CONTENT_SECURITY_POLICY, content_security_policy.to_string()))
}

/// Request interdiction pipeline
pub async fn edge_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    let Some(state) = req.app_data::<web::Data<EdgeState>>().cloned() else {
        error!("Edge state missing from application data, forwarding unscreened");
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    };

    let source_address = client_address(&req, state.config.server.trust_forwarded_headers);
    let method = req.method().as_str().to_string();
    let path = req.path().to_string();
    let user_agent = user_agent(&req);

    // Rules see the path the router resolves, with unreserved escapes decoded;
    // the event keeps the path as sent.
    let route_path = req.match_info().as_str().to_string();
    let descriptor = RequestDescriptor::new(&route_path, &method, user_agent.as_deref());
    let Classification { verdict, reason } = state.classifier.classify(&descriptor);
    let category = EventCategory::from(verdict);

    if verdict.is_fast_block() {
        warn!(
            "Blocked {} {} from {}: {}",
            method,
            path,
            source_address,
            reason.as_deref().unwrap_or("blocked")
        );
        state.events.record(SecurityEventInput {
            source_address,
            path,
            method,
            user_agent,
            blocked: true,
            category,
            reason,
        });
        monitoring::record_outcome(category);
        return Ok(req.into_response(access_denied()).map_into_right_body());
    }

    if let Some(decoy) = state.honeypot.respond(verdict, &descriptor) {
        info!(
            "Decoy {} for {} {} from {}, holding {}ms",
            category.as_str(),
            method,
            path,
            source_address,
            decoy.delay.as_millis()
        );
        state.events.record(SecurityEventInput {
            source_address,
            path,
            method,
            user_agent,
            blocked: true,
            category,
            reason,
        });
        monitoring::record_outcome(category);
        monitoring::record_decoy_delay(category, decoy.delay);

        tokio::time::sleep(decoy.delay).await;

        let status = StatusCode::from_u16(decoy.status).unwrap_or(StatusCode::NOT_FOUND);
        let response = HttpResponse::build(status)
            .content_type(ContentType::html())
            .insert_header((header::SERVER, state.config.honeypot.server_banner.as_str()))
            .body(decoy.body);
        return Ok(req.into_response(response).map_into_right_body());
    }

    let decision = state.rate_limiter.check(&source_address, Instant::now());
    if !decision.allowed {
        let window_seconds = state.config.rate_limit.window_seconds;
        warn!(
            "Rate limit exceeded for {}: {} requests in {}s",
            source_address, decision.current_count, window_seconds
        );
        state.events.record(SecurityEventInput::blocked(
            source_address,
            method,
            path,
            user_agent,
            EventCategory::RateLimit,
            format!(
                "{} requests within {}s window",
                decision.current_count, window_seconds
            ),
        ));
        monitoring::record_outcome(EventCategory::RateLimit);
        return Ok(req
            .into_response(too_many_requests(window_seconds))
            .map_into_right_body());
    }

    debug!("Forwarding {} {} from {}", method, path, source_address);
    state
        .events
        .record(SecurityEventInput::passed(source_address, method, path, user_agent));
    monitoring::record_outcome(EventCategory::Legitimate);

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}

fn access_denied() -> HttpResponse {
    HttpResponse::Forbidden().json(ErrorBody::new("Access denied"))
}

fn too_many_requests(retry_after_seconds: u64) -> HttpResponse {
    HttpResponse::TooManyRequests()
        .insert_header((header::RETRY_AFTER, retry_after_seconds.to_string()))
        .json(ErrorBody::new("Too many requests"))
}
