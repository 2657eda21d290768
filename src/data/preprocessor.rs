// ============================================================
// Layer 4 — Line Preprocessor
// ============================================================
// Normalises one side of a corpus line before tokenisation:
//
//   1. Unicode space variants, tabs and control characters
//      become a plain space
//   2. runs of spaces collapse into one
//   3. leading/trailing spaces are trimmed
//
// Without this the tokenizer would see "a\u{00A0}b" and "a b"
// as different inputs.

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true;

        for c in text.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() || c.is_whitespace() => ' ',
                c => c,
            };
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
