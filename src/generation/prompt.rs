use serde::{Deserialize, Serialize};

use super::GenerationRequest;
use crate::contract::LanguageStyle;

const TRUNCATION_MARKER: &str = " [transcript truncated]";
const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub guidance: String,
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content,
        }
    }
}

pub fn platform_profile(platform: &str) -> PlatformProfile {
    let (guidance, max_chars): (String, Option<usize>) = match platform {
        "linkedin" => (
            "Write a LinkedIn post for a professional audience. Open with a strong hook line, \
             share two or three concrete takeaways from the video, end with a question that \
             invites comments, and add three to five relevant hashtags."
                .into(),
            Some(3000),
        ),
        "twitter" | "x" => (
            "Write a single tweet. Be punchy and specific, use at most two hashtags and no \
             thread numbering."
                .into(),
            Some(280),
        ),
        "facebook" => (
            "Write a friendly Facebook post that summarizes the video and encourages people \
             to watch and share it."
                .into(),
            None,
        ),
        "instagram" => (
            "Write an Instagram caption: an engaging first line, a short summary, a call to \
             action, then a block of up to ten hashtags."
                .into(),
            Some(2200),
        ),
        "youtube" => (
            "Write a YouTube video description: a two sentence summary, a list of key points, \
             and a call to subscribe."
                .into(),
            Some(5000),
        ),
        "blog" => (
            "Write a short blog article with a title, an introduction, three sections with \
             headings, and a conclusion. Use markdown."
                .into(),
            None,
        ),
        "veo_prompt" => (
            "Write a prompt for a text-to-video model that produces a 30 second promotional \
             clip for this video. Describe scenes, camera movement, mood and on-screen text. \
             Return only the prompt."
                .into(),
            Some(2000),
        ),
        other => (
            format!(
                "Write a post suitable for publishing on {other}. Match the tone and length \
                 conventions of that platform."
            ),
            None,
        ),
    };
    PlatformProfile {
        guidance,
        max_chars,
    }
}

pub fn style_instruction(style: LanguageStyle) -> &'static str {
    match style {
        LanguageStyle::English => "Write in clear, natural English.",
        LanguageStyle::Urdu => {
            "Write in Urdu using the Urdu (Nastaliq/Arabic) script. Keep brand names and \
             hashtags in their original form."
        }
        LanguageStyle::RomanUrdu => {
            "Write in Roman Urdu: Urdu written in the Latin alphabet, mixed naturally with \
             English words the way people in Pakistan write on social media. Do not use the \
             Urdu script."
        }
    }
}

/// Cuts `text` to at most `max_chars` characters, preferring a whitespace
/// boundary, and appends a marker when anything was removed.
pub fn truncate_transcript(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head = cut_at_word_boundary(text, max_chars);
    format!("{}{TRUNCATION_MARKER}", head.trim_end())
}

pub fn build_messages(request: &GenerationRequest<'_>, max_transcript_chars: usize) -> Vec<ChatMessage> {
    let profile = platform_profile(request.platform);
    let mut system = String::from(
        "You are a social media copywriter. You turn video transcripts into ready-to-publish \
         marketing copy. Only use facts that appear in the transcript.\n",
    );
    system.push_str(&profile.guidance);
    system.push('\n');
    system.push_str(style_instruction(request.style));
    if let Some(limit) = profile.max_chars {
        system.push_str(&format!("\nThe result must not exceed {limit} characters."));
    }
    system.push_str("\nReturn only the post text, without explanations or surrounding quotes.");

    let title = if request.video_title.trim().is_empty() {
        "(untitled)"
    } else {
        request.video_title.trim()
    };
    let user = format!(
        "Video title: {title}\nPlatform: {}\n\nTranscript:\n{}",
        request.platform,
        truncate_transcript(request.transcript, max_transcript_chars)
    );

    vec![ChatMessage::new("system", system), ChatMessage::new("user", user)]
}

/// Strips wrappers models like to add around the answer. Returns `None`
/// when nothing is left.
pub fn clean_completion(raw: &str) -> Option<String> {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let rest = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest,
        };
        text = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    for (open, close) in [('"', '"'), ('“', '”'), ('\'', '\'')] {
        if text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close) {
            let inner = &text[open.len_utf8()..text.len() - close.len_utf8()];
            if !inner.contains(open) && !inner.contains(close) {
                text = inner.trim();
            }
            break;
        }
    }

    (!text.is_empty()).then(|| text.to_string())
}

/// Shortens `text` to at most `max_chars` characters, cutting on a word
/// boundary when possible and ending with an ellipsis.
pub fn enforce_limit(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let head = cut_at_word_boundary(text, max_chars - 1);
    let mut shortened = head.trim_end().to_string();
    shortened.push(ELLIPSIS);
    shortened
}

/// The first `max_chars` characters of `text`, backed off to the last
/// whitespace unless the cut already falls on one. Words longer than half the
/// budget are split rather than dropping most of the text.
fn cut_at_word_boundary(text: &str, max_chars: usize) -> &str {
    let cut = byte_index_of_char(text, max_chars);
    let head = &text[..cut];
    if text[cut..].starts_with(char::is_whitespace) {
        return head;
    }
    match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 && space >= cut / 2 => &head[..space],
        _ => head,
    }
}

fn byte_index_of_char(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(platform: &'a str, style: LanguageStyle, transcript: &'a str) -> GenerationRequest<'a> {
        GenerationRequest {
            video_title: "Rust in production",
            transcript,
            platform,
            style,
        }
    }

    #[test]
    fn known_platforms_have_limits() {
        assert_eq!(platform_profile("twitter").max_chars, Some(280));
        assert_eq!(platform_profile("x").max_chars, Some(280));
        assert_eq!(platform_profile("linkedin").max_chars, Some(3000));
        assert_eq!(platform_profile("blog").max_chars, None);
        let custom = platform_profile("threads");
        assert!(custom.guidance.contains("threads"));
        assert_eq!(custom.max_chars, None);
    }

    #[test]
    fn messages_carry_platform_style_and_transcript() {
        let messages = build_messages(
            &request("twitter", LanguageStyle::RomanUrdu, "we shipped it"),
            1000,
        );
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("Roman Urdu"));
        assert!(messages[0].content.contains("280 characters"));
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.contains("Video title: Rust in production"));
        assert!(messages[1].content.contains("Platform: twitter"));
        assert!(messages[1].content.ends_with("we shipped it"));
    }

    #[test]
    fn urdu_style_asks_for_urdu_script() {
        let messages = build_messages(&request("linkedin", LanguageStyle::Urdu, "x"), 100);
        assert!(messages[0].content.contains("Nastaliq"));
    }

    #[test]
    fn long_transcripts_are_truncated() {
        let transcript = "word ".repeat(100);
        let truncated = truncate_transcript(&transcript, 42);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        let body = truncated.trim_end_matches(TRUNCATION_MARKER);
        assert!(body.chars().count() <= 42);
        assert!(body.ends_with("word"));
        assert_eq!(truncate_transcript("short", 42), "short");
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let transcript = "سلام".repeat(20);
        let truncated = truncate_transcript(&transcript, 10);
        assert!(truncated.starts_with("سلامسلام"));
    }

    #[test]
    fn cleans_fences_and_quotes() {
        assert_eq!(clean_completion("  hello  ").as_deref(), Some("hello"));
        assert_eq!(
            clean_completion("```markdown\n# Title\nbody\n```").as_deref(),
            Some("# Title\nbody")
        );
        assert_eq!(clean_completion("\"quoted post\"").as_deref(), Some("quoted post"));
        assert_eq!(clean_completion("“curly”").as_deref(), Some("curly"));
        assert_eq!(
            clean_completion("\"a\" and \"b\"").as_deref(),
            Some("\"a\" and \"b\"")
        );
        assert_eq!(clean_completion("   "), None);
        assert_eq!(clean_completion("```\n```"), None);
    }

    #[test]
    fn enforce_limit_never_exceeds_limit() {
        let text = "one two three four five six seven eight nine ten";
        for limit in [0usize, 1, 5, 9, 20, 48] {
            let limited = enforce_limit(text, limit);
            assert!(
                limited.chars().count() <= limit,
                "limit {limit} produced {limited:?}"
            );
        }
        assert_eq!(enforce_limit(text, 14), "one two three…");
        assert_eq!(enforce_limit(text, 200), text);
    }
}
