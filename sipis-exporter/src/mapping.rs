//! Mapping from [`Measurement`] fields to Prometheus gauges.

use crate::measurement::Measurement;

/// Name prefix shared by every exported gauge.
pub const METRIC_PREFIX: &str = "sipis";

/// Label carrying the instance base URL on every series.
pub const INSTANCE_LABEL: &str = "instance";

/// A numeric [`Measurement`] field exported as a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    InstanceCount,
    InstanceIdleCount,
    InstanceRegisteredCount,
    InstanceRegisteringCount,
    InstanceUnauthorizedCount,
    InstanceErrorCount,
    ServerUptimeInSeconds,
    ServerMessageLoopQueueSize,
}

impl MetricField {
    /// Every exported field, in registration order.
    pub const ALL: [MetricField; 8] = [
        MetricField::InstanceCount,
        MetricField::InstanceIdleCount,
        MetricField::InstanceRegisteredCount,
        MetricField::InstanceRegisteringCount,
        MetricField::InstanceUnauthorizedCount,
        MetricField::InstanceErrorCount,
        MetricField::ServerUptimeInSeconds,
        MetricField::ServerMessageLoopQueueSize,
    ];

    /// Metric name without the [`METRIC_PREFIX`].
    pub fn name(&self) -> &'static str {
        match self {
            MetricField::InstanceCount => "instance_count",
            MetricField::InstanceIdleCount => "instance_idle_count",
            MetricField::InstanceRegisteredCount => "instance_registered_count",
            MetricField::InstanceRegisteringCount => "instance_registering_count",
            MetricField::InstanceUnauthorizedCount => "instance_unauthorized_count",
            MetricField::InstanceErrorCount => "instance_error_count",
            MetricField::ServerUptimeInSeconds => "server_uptime_in_seconds",
            MetricField::ServerMessageLoopQueueSize => "server_message_loop_queue_size",
        }
    }

    /// Fully qualified metric name as it appears on the exposition endpoint.
    pub fn full_name(&self) -> String {
        format!("{}_{}", METRIC_PREFIX, self.name())
    }

    /// HELP text.
    pub fn help(&self) -> &'static str {
        match self {
            MetricField::InstanceCount => "Instance Count",
            MetricField::InstanceIdleCount => "Instance Idle Count",
            MetricField::InstanceRegisteredCount => "Instance Registered Count",
            MetricField::InstanceRegisteringCount => "Instance Registering Count",
            MetricField::InstanceUnauthorizedCount => "Instance Unauthorized Count",
            MetricField::InstanceErrorCount => "Instance Error Count",
            MetricField::ServerUptimeInSeconds => "Server Uptime in Seconds",
            MetricField::ServerMessageLoopQueueSize => "Server Message Loop Queue Size",
        }
    }

    /// Read this field from a measurement. Values pass through unchanged.
    pub fn extract(&self, measurement: &Measurement) -> f64 {
        let instance = &measurement.instance;
        let server = &measurement.server;

        match self {
            MetricField::InstanceCount => instance.count,
            MetricField::InstanceIdleCount => instance.count_in_state.idle,
            MetricField::InstanceRegisteredCount => instance.count_in_state.registered,
            MetricField::InstanceRegisteringCount => instance.count_in_state.registering,
            MetricField::InstanceUnauthorizedCount => instance.count_in_state.unauthorized,
            MetricField::InstanceErrorCount => instance.count_in_state.error,
            MetricField::ServerUptimeInSeconds => server.uptime_in_seconds,
            MetricField::ServerMessageLoopQueueSize => server.message_loop_queue_size,
        }
    }
}
