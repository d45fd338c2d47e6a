// ABOUTME: Metrics recording helpers using the metrics facade.
// ABOUTME: Counters and histograms for inbound traffic, commands, tools, and turn outcomes.

/// Record an inbound message by kind ("chat", "command", "answer")
pub fn record_message_received(kind: &str) {
    metrics::counter!("courier_messages_received_total", "kind" => kind.to_string()).increment(1);
}

/// Record a dispatched slash command by name
pub fn record_command(command: &str) {
    metrics::counter!("courier_commands_total", "command" => command.to_string()).increment(1);
}

/// Record a tool the agent used during a turn
pub fn record_tool_used(tool: &str) {
    metrics::counter!("courier_tools_used_total", "tool" => tool.to_string()).increment(1);
}

/// Record how a turn ended ("completed", "timeout", "aborted", "error")
pub fn record_turn_outcome(outcome: &str) {
    metrics::counter!("courier_turn_outcomes_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record an outbound message delivered to an adapter
pub fn record_message_sent() {
    metrics::counter!("courier_messages_sent_total").increment(1);
}

/// Record an internal error by kind
pub fn record_error(kind: &str) {
    metrics::counter!("courier_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Record end-to-end inbound processing duration in seconds
pub fn record_message_processing_duration(seconds: f64) {
    metrics::histogram!("courier_message_processing_seconds").record(seconds);
}
