use html_escape::encode_text;

use crate::core::Card;

/// HTML for the Back field. All card text is escaped.
pub fn render_back(card: &Card) -> String {
    let translations = card
        .translations
        .iter()
        .map(|t| format!("• <i>{}</i> — {}", encode_text(&t.part_of_speech), encode_text(&t.text)))
        .collect::<Vec<_>>()
        .join("<br>");

    let examples = card
        .examples
        .iter()
        .map(|e| {
            let sentence = encode_text(&e.sentence);
            if e.translation.is_empty() {
                format!("• {sentence}")
            } else {
                format!("• {sentence}<br>&nbsp;&nbsp;<i>{}</i>", encode_text(&e.translation))
            }
        })
        .collect::<Vec<_>>()
        .join("<br>");

    format!(
        "<b>1. Translation (Переклад):</b><br>\n{translations}<br><br>\n\
         <b>2. Pronunciation (Вимова):</b><br>\n🇬🇧 {british}<br>\n🇺🇸 {american}<br><br>\n\
         <b>3. Explanation (Пояснення):</b><br>\n{english}<br>\n{ukrainian}<br><br>\n\
         <b>4. Examples (Приклади):</b><br>\n{examples}",
        british = encode_text(&card.ipa.british),
        american = encode_text(&card.ipa.american),
        english = encode_text(&card.explanations.english),
        ukrainian = encode_text(&card.explanations.ukrainian),
    )
}
