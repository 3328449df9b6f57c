//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# LTI chat client configuration
# Only override what you want to change -- missing fields use defaults.

[connection]
# url = "ws://localhost:8000/ws"
# max_retries = 3             # 0-20, reconnect attempts before giving up
# retry_delay_ms = 2000       # 100-60000, fixed delay between attempts
# connect_timeout_secs = 15   # 1-120
# send_exchange_id = false    # tag outbound frames with the user message id

[session]
# bot_name = "LTI-Bot"
# quota_max = 8               # 1-1000, questions per session
# welcome_message = "..."
# example_questions = ["FPT đầu tư dài hạn được không?", "Nên chọn VCB hay MBB?"]

[logging]
# level = "info"              # trace, debug, info, warn, error
"##
    .to_string()
}
