use std::future::Future;

use tracing::warn;

use crate::gen::client::FetchError;
use crate::wizard::session::Session;

/// One successful attempt: the fetched bytes plus the direct request URL,
/// so either output type can be served from the same collection.
#[derive(Debug, Clone)]
pub struct Generated {
    pub bytes: Vec<u8>,
    pub url: String,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub attempts: u8,
    pub items: Vec<Generated>,
    pub failures: Vec<(u8, FetchError)>,
}

impl BatchOutcome {
    pub fn all_failed(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-attempt prompt. The variation suffix keeps attempts distinct even
/// against a prompt-keyed cache upstream.
pub fn attempt_prompt(session: &Session, attempt: u8) -> String {
    let mut prompt = format!("{}, {} style", session.prompt, session.style.label());
    if !session.negative_prompt.is_empty() {
        prompt.push_str(&format!(", no {}", session.negative_prompt));
    }
    prompt.push_str(&format!(" (variation {attempt})"));
    prompt
}

pub fn progress_text(current: u8, total: u8) -> String {
    let total = total.max(1);
    let percent = u32::from(current) * 100 / u32::from(total);
    let filled = (u32::from(current) * 10 / u32::from(total)) as usize;
    let bar: String = "\u{2593}".repeat(filled) + &"\u{2591}".repeat(10 - filled);
    format!("Generating image {current}/{total}\n[{bar}] {percent}%")
}

/// Runs exactly `num_images` attempts in order, never aborting on a
/// failure. `attempt` owns any progress reporting and failure notices;
/// this loop only keeps the books.
pub async fn collect_batch<F, Fut>(num_images: u8, mut attempt: F) -> BatchOutcome
where
    F: FnMut(u8) -> Fut,
    Fut: Future<Output = Result<Generated, FetchError>>,
{
    let mut items = Vec::new();
    let mut failures = Vec::new();

    for index in 1..=num_images {
        match attempt(index).await {
            Ok(generated) => items.push(generated),
            Err(err) => {
                warn!("generation attempt {index}/{num_images} failed: {err}");
                failures.push((index, err));
            }
        }
    }

    BatchOutcome {
        attempts: num_images,
        items,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::session::{AspectRatio, OutputType, Quality, StylePreset};
    use reqwest::StatusCode;

    fn session_with(negative: &str) -> Session {
        Session {
            prompt: "a red fox".to_string(),
            negative_prompt: negative.to_string(),
            timeout_seconds: 60,
            num_images: 3,
            quality: Quality::Standard,
            ratio: AspectRatio::Square,
            style: StylePreset::Realistic,
            output_type: OutputType::Images,
        }
    }

    #[test]
    fn attempt_prompt_includes_style_and_variation() {
        let prompt = attempt_prompt(&session_with(""), 1);
        assert_eq!(prompt, "a red fox, realistic style (variation 1)");
    }

    #[test]
    fn attempt_prompt_appends_exclusions_when_present() {
        let prompt = attempt_prompt(&session_with("blur, text"), 2);
        assert_eq!(
            prompt,
            "a red fox, realistic style, no blur, text (variation 2)"
        );
    }

    #[test]
    fn progress_text_reports_a_bar_and_percentage() {
        let text = progress_text(3, 5);
        assert!(text.contains("3/5"));
        assert!(text.contains("60%"));
    }

    #[tokio::test]
    async fn every_attempt_runs_even_after_failures() {
        let outcome = collect_batch(3, |index| async move {
            if index == 2 {
                Ok(Generated {
                    bytes: vec![index],
                    url: format!("https://img.example/{index}"),
                })
            } else {
                Err(FetchError::Status(StatusCode::BAD_GATEWAY))
            }
        })
        .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(
            outcome.failures.iter().map(|(i, _)| *i).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[tokio::test]
    async fn total_failure_is_a_valid_terminal_outcome() {
        let outcome = collect_batch(2, |_| async {
            Err(FetchError::Timeout(60))
        })
        .await;
        assert!(outcome.all_failed());
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn attempts_run_in_order() {
        let outcome = collect_batch(4, |index| async move {
            Ok(Generated {
                bytes: vec![index],
                url: String::new(),
            })
        })
        .await;
        let order: Vec<u8> = outcome.items.iter().map(|g| g.bytes[0]).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
    }
}
