//! ---
//! confsig_section: "03-logging"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Structured logging context for channel lifecycle events."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
/// Emit an informational log enriched with signaling context.
#[macro_export]
macro_rules! sig_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::sig_event!(tracing::Level::INFO, context = $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::sig_event!(tracing::Level::INFO, context = $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with signaling context.
#[macro_export]
macro_rules! sig_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::sig_event!(tracing::Level::DEBUG, context = $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::sig_event!(tracing::Level::DEBUG, context = $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with signaling context.
#[macro_export]
macro_rules! sig_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::sig_event!(tracing::Level::WARN, context = $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::sig_event!(tracing::Level::WARN, context = $crate::LogContext::default(), $($arg)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! sig_event {
    ($level:expr, context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            room = ctx.room.unwrap_or(""),
            signaling_event = ctx.event.unwrap_or(""),
            message_id = ctx.message_id.unwrap_or_default(),
            state = ctx.state.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}
