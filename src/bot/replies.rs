use std::collections::BTreeMap;

use crate::{
    access::AccessStatus,
    anki::DeckStats,
    core::{
        Card,
        CardField,
    },
    spelling::WordRejection,
};

pub const DENIED: &str = "🚫 Unauthorized access.\n\n\
    This bot is private and restricted to authorized users only.\n\
    Your access attempt has been logged.";

pub const SETUP_HINT: &str =
    "ℹ️ No authorized user configured yet.\nUse /start <auth_code> to authenticate.";

pub const HELP: &str = "🤖 Anki Vocabulary Bot\n\n\
    Send me any English word and I'll check the spelling, create a flashcard and add it \
    to Anki.\n\n\
    Cards include Ukrainian translations, British and American IPA, explanations and \
    example sentences. Every card is validated before it is added, and partial attempts \
    are merged into one complete card.\n\n\
    Commands:\n\
    /start - Check that Anki is running\n\
    /sync - Sync your Anki collection\n\
    /stats - View deck statistics\n\
    /security - Show access status\n\
    /revoke - Give up access to this bot\n\
    /help - Show this message\n\n\
    If I suggest a spelling correction, reply with yes, no or cancel.";

pub const GREETING: &str = "👋 Hello! I'm here to help you learn vocabulary.\n\n\
    Send me any English word you'd like to learn, and I'll create a flashcard for you!\n\n\
    For example: serendipity, eloquent, perseverance";

pub const ANKI_READY: &str = "✅ Anki is running!\n\nSend me any English word and I'll create a flashcard for you.";
pub const ANKI_DOWN: &str = "❌ Anki is not running!\nPlease make sure Anki is started and AnkiConnect is installed.";
pub const ANKI_STARTING: &str = "⚠️ Anki is not reachable.\nPlease wait a moment and try again.";
pub const SYNCING: &str = "🔄 Syncing Anki collection...";
pub const SYNC_DONE: &str = "✅ Sync completed!";
pub const SYNC_FAILED_SAVED: &str = "⚠️ Sync failed (card still saved locally)";
pub const CANCELLED: &str = "❌ Cancelled";
pub const REVOKE_CONFIRM: &str = "⚠️ This will revoke your access to the bot.\n\
    You'll need to authenticate again with the auth code.\n\n\
    Send /confirm_revoke to proceed.";
pub const REVOKED: &str = "✅ Access revoked. Use /start <auth_code> to authenticate again.";
pub const REVOKE_LAPSED: &str = "Revocation cancelled.";
pub const NO_PENDING_REVOKE: &str = "No pending revocation.";

pub fn authenticated(identity: &str) -> String {
    format!("✅ Authentication successful!\n{identity} is now authorized to use this bot.")
}

pub fn unknown_command(name: &str) -> String {
    format!("Unknown command /{name}. Send /help to see what I can do.")
}

pub fn rejected(word: &str, reason: WordRejection) -> String {
    match reason {
        WordRejection::Greeting => GREETING.to_string(),
        other => format!(
            "⚠️ '{word}' doesn't appear to be a valid vocabulary word ({other}).\n\
             Please send an English word you'd like to learn."
        ),
    }
}

pub fn spelling_prompt(original: &str, suggestion: &str) -> String {
    format!(
        "🔍 Did you mean {suggestion} instead of '{original}'?\n\n\
         Reply with:\n\
         • yes - to use '{suggestion}'\n\
         • no - to keep '{original}'\n\
         • cancel - to cancel"
    )
}

pub fn spelling_reprompt(original: &str, suggestion: &str) -> String {
    format!(
        "Please respond with:\n\
         • yes or y - to use '{suggestion}'\n\
         • no or n - to keep '{original}'\n\
         • cancel or c - to cancel"
    )
}

pub fn using_suggestion(word: &str) -> String {
    format!("✅ Using corrected word: {word}")
}

pub fn keeping_original(word: &str) -> String {
    format!("✅ Keeping original word: {word}")
}

pub fn duplicate(word: &str) -> String {
    format!("⚠️ Word '{word}' already exists in your Anki deck!")
}

pub fn generating(word: &str) -> String {
    format!("🔄 Generating flashcard for '{word}'...\nThis may take a moment.")
}

pub fn exhausted(word: &str, field_errors: &BTreeMap<CardField, String>) -> String {
    let missing = field_errors
        .iter()
        .map(|(field, reason)| format!("• {field}: {reason}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "❌ Could not generate a complete card for '{word}'.\n{missing}\n\n\
         Please try again in a moment."
    )
}

pub fn added(card: &Card) -> String {
    let mut message = format!("✅ Added '{}' to Anki!\n", card.word);
    if let Some(first) = card.translations.first() {
        message.push_str(&format!("\n📝 Translation: {} ({})", first.text, first.part_of_speech));
    }
    message.push_str(&format!("\n🔊 Pronunciation: {}", card.ipa.british));
    message
}

pub fn store_failed(error: &str) -> String {
    format!("❌ Failed to add card: {error}\nPlease try again or check your Anki settings.")
}

pub fn sync_failed(error: &str) -> String {
    format!("❌ Sync failed: {error}\nPlease check your Anki sync settings.")
}

pub fn stats(stats: &DeckStats, active_sessions: usize) -> String {
    format!(
        "📊 Anki Statistics\n\n\
         Deck: {}\n\
         Total cards: {}\n\
         New: {} · Learning: {} · Review: {}\n\
         Active bot sessions: {}",
        stats.name,
        stats.total_in_deck,
        stats.new_count,
        stats.learn_count,
        stats.review_count,
        active_sessions
    )
}

pub fn stats_failed(error: &str) -> String {
    format!("❌ Failed to get stats: {error}")
}

pub fn security(status: &AccessStatus) -> String {
    let authorized =
        status.authorized.as_ref().map(|i| i.to_string()).unwrap_or_else(|| "none".to_string());
    let total: usize = status.denied_counts.iter().map(|(_, count)| count).sum();

    let mut message = format!(
        "🔒 Security Status\n\nAuthorized identity: {authorized}\nDenied attempts: {total}\nBlocked identities: {}",
        status.blocked.len()
    );
    if !status.denied_counts.is_empty() {
        message.push_str("\n\nRecent attempts:");
        for (identity, count) in status.denied_counts.iter().take(5) {
            message.push_str(&format!("\n• {identity}: {count} attempts"));
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Explanations,
        Identity,
        Ipa,
        Translation,
    };

    #[test]
    fn test_added_previews_first_translation_and_british_ipa() {
        let card = Card {
            word: "receive".into(),
            translations: vec![Translation { text: "отримувати".into(), part_of_speech: "verb".into() }],
            ipa: Ipa { british: "/rɪˈsiːv/".into(), american: "/rɪˈsiv/".into() },
            explanations: Explanations { english: "e".into(), ukrainian: "у".into() },
            examples: Vec::new(),
        };
        let message = added(&card);
        assert!(message.contains("📝 Translation: отримувати (verb)"));
        assert!(message.contains("🔊 Pronunciation: /rɪˈsiːv/"));
        assert!(!message.contains("/rɪˈsiv/"));
    }

    #[test]
    fn test_security_report() {
        let status = AccessStatus {
            authorized: Some(Identity::from("alice")),
            blocked: vec![Identity::from("mallory")],
            denied_counts: vec![(Identity::from("mallory"), 5), (Identity::from("bob"), 1)],
            recent_denied: Vec::new(),
        };
        let message = security(&status);
        assert!(message.contains("Authorized identity: alice"));
        assert!(message.contains("Denied attempts: 6"));
        assert!(message.contains("• mallory: 5 attempts"));
    }

    #[test]
    fn test_exhausted_lists_fields() {
        let errors = BTreeMap::from([(CardField::Examples, "no examples found".to_string())]);
        assert!(exhausted("xylophonezzz", &errors).contains("• examples: no examples found"));
    }
}
