use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder};

static FRAMES_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "notification_sync_frames_received_total",
            "Push frames decoded by the notification sync client",
        ),
        &["event_type"],
    )
    .expect("failed to create notification_sync_frames_received_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register notification_sync_frames_received_total");
    counter
});

static FRAMES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "notification_sync_frames_dropped_total",
        "Malformed push frames dropped without closing the connection",
    )
    .expect("failed to create notification_sync_frames_dropped_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register notification_sync_frames_dropped_total");
    counter
});

static RECONNECTS_SCHEDULED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "notification_sync_reconnects_scheduled_total",
        "Automatic reconnections scheduled after a transport loss",
    )
    .expect("failed to create notification_sync_reconnects_scheduled_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register notification_sync_reconnects_scheduled_total");
    counter
});

static TOASTS_SHOWN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "notification_sync_toasts_shown_total",
        "Ephemeral alerts surfaced for newly pushed notifications",
    )
    .expect("failed to create notification_sync_toasts_shown_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register notification_sync_toasts_shown_total");
    counter
});

static UNREAD_NOTIFICATIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "notification_sync_unread_notifications",
        "Unread count computed from the local store after the last mutation",
    )
    .expect("failed to create notification_sync_unread_notifications");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register notification_sync_unread_notifications");
    gauge
});

pub fn observe_frame(event_type: &str) {
    FRAMES_RECEIVED_TOTAL.with_label_values(&[event_type]).inc();
}

pub fn observe_dropped_frame() {
    FRAMES_DROPPED_TOTAL.inc();
}

pub fn observe_reconnect_scheduled() {
    RECONNECTS_SCHEDULED_TOTAL.inc();
}

pub fn observe_toast() {
    TOASTS_SHOWN_TOTAL.inc();
}

pub fn set_unread(count: usize) {
    UNREAD_NOTIFICATIONS.set(count as i64);
}

/// Text exposition of every registered metric
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# failed to encode metrics: {}", err);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
