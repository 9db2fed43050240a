pub const FEW_SHOT_EXAMPLES: &str = r#"
Example 1 for word "received":
TRANSLATION: verb — отримав/отримала; past participle — отриманий
IPA_BRITISH: /rɪˈsiːvd/
IPA_AMERICAN: /rɪˈsiːvd/
EXPLANATION_EN: Past tense of receive; to have gotten or obtained something
EXPLANATION_UK: Минулий час від receive; отримав або одержав щось
EXAMPLE: I received your letter yesterday. | Я отримав твого листа вчора.

Example 2 for word "run":
TRANSLATION: verb — бігти/бігати; noun — біг/пробіжка
IPA_BRITISH: /rʌn/
IPA_AMERICAN: /rʌn/
EXPLANATION_EN: To move rapidly on foot; an act or period of running
EXPLANATION_UK: Швидко рухатися пішки; біг або пробіжка
EXAMPLE: She likes to run every evening. | Вона любить бігати щовечора.
EXAMPLE: I went for a morning run in the park. | Я пішов на ранкову пробіжку в парк.
"#;

pub fn card_prompt(word: &str) -> String {
    format!(
        r#"Create a vocabulary card for the English word "{word}".

CRITICAL RULES:
1. Use ONLY plain text. Do NOT use ** or * or any markdown formatting.
2. Each line must start with the exact label shown below.
3. Always include Ukrainian translations in Cyrillic script.
4. Every EXAMPLE sentence must contain the word "{word}".
{FEW_SHOT_EXAMPLES}
Now create a card for "{word}" following this EXACT format:
TRANSLATION: [part of speech] — [Ukrainian translation]; [part of speech] — [Ukrainian translation]
IPA_BRITISH: /[IPA British]/
IPA_AMERICAN: /[IPA American]/
EXPLANATION_EN: [English explanation]
EXPLANATION_UK: [Ukrainian explanation]
EXAMPLE: [English sentence with the word] | [Ukrainian translation]"#
    )
}

pub fn spelling_prompt(word: &str) -> String {
    format!(
        r#"Check if the English word "{word}" is spelled correctly.

If it's correct, respond with: CORRECT
If it's misspelled, respond with: CORRECTION: [correct spelling]

Only correct obvious misspellings. Examples:
- "recieve" -> CORRECTION: receive
- "necessary" -> CORRECT
- "definately" -> CORRECTION: definitely"#
    )
}
