//! Usage telemetry and diagnostic log polling

pub mod agent_log;
pub mod usage;

pub use agent_log::{AgentLogPoller, AgentLogWatch};
pub use usage::{
    SqsUsageSink, TracingUsageSink, UsageEntry, UsageRecord, UsageRecorder, UsageSink,
    response_time_ms,
};
