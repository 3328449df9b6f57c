use serde::{Deserialize, Serialize};

const DEFAULT_WELCOME: &str = "Chào mừng bạn đến với Trợ lý Đầu tư AI! Tôi chỉ tư vấn chứng khoán dài hạn.
Bạn có thể hỏi tôi tất tần tật về đầu tư dài hạn các cổ phiếu trong VN100.

*Lưu ý: Tôi không phải cố vấn tài chính được cấp phép; thông tin chỉ mang tính tham khảo. Đầu tư luôn tiềm ẩn rủi ro; bạn nên tự đánh giá trước khi quyết định.*

Hãy đặt câu hỏi để bắt đầu! Một số câu hỏi gợi ý: ";

/// Per-session behavior: quota, greeting, and suggested questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Display name of the assistant.
    pub bot_name: String,
    /// Questions allowed per session (valid range: 1-1000).
    pub quota_max: u32,
    /// Content of the assistant message every fresh session starts with.
    pub welcome_message: String,
    /// Suggestions offered below the welcome message.
    pub example_questions: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bot_name: "LTI-Bot".into(),
            quota_max: 8,
            welcome_message: DEFAULT_WELCOME.into(),
            example_questions: vec![
                "FPT đầu tư dài hạn được không?".into(),
                "Đây có phải thời điểm tốt để xuống tiền ko mài ?".into(),
                "30 triệu nên đầu tư ngành nào?".into(),
                "Những ngành nào có triển vọng trong 5 năm tới?".into(),
                "Nên chọn VCB hay MBB?".into(),
            ],
        }
    }
}
