//! Free functions writing to the process-wide logger.
//!
//! These mirror the methods on [`Logger`](crate::logger::Logger) so call
//! sites do not need to carry a logger handle around.

use crate::context::LogContext;
use crate::fields::Body;
use crate::init::logger;
use crate::record::Level;
use std::error::Error;

pub fn log_request<C: LogContext + ?Sized>(ctx: &C, body: Option<Body<'_>>) {
    logger().log_request(ctx, body);
}

pub fn log_request_with_headers<C: LogContext + ?Sized>(
    ctx: &C,
    body: Option<Body<'_>>,
    headers: &[(&str, &str)],
) {
    logger().log_request_with_headers(ctx, body, headers);
}

pub fn log_response<C: LogContext + ?Sized>(ctx: &C, body: Option<Body<'_>>, status: u16) {
    logger().log_response(ctx, body, status);
}

pub fn log_response_with_headers<C: LogContext + ?Sized>(
    ctx: &C,
    body: Option<Body<'_>>,
    status: u16,
    headers: &[(&str, &str)],
) {
    logger().log_response_with_headers(ctx, body, status, headers);
}

pub fn log_error<C: LogContext + ?Sized>(ctx: &C, err: &dyn Error) {
    logger().log_error(ctx, err);
}

pub fn log_info<C: LogContext + ?Sized>(ctx: &C, message: &str) {
    logger().log_info(ctx, message);
}

pub fn log_warning<C: LogContext + ?Sized>(ctx: &C, message: &str) {
    logger().log_warning(ctx, message);
}

pub fn log_event<C: LogContext + ?Sized>(level: Level, ctx: &C, message: &str, body: Option<Body<'_>>) {
    logger().log_event(level, ctx, message, body);
}

/// Log `err` at `level` on the process-wide logger and return it.
pub fn log_return<C, E>(ctx: &C, level: Level, err: E) -> E
where
    C: LogContext + ?Sized,
    E: Error,
{
    logger().log_return(ctx, level, err)
}
