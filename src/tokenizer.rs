/// Splits text into maximal ASCII alphanumeric runs, lowercased, in order of
/// appearance. No stemming and no stop-word removal: token positions must
/// line up 1:1 with index offsets into the raw token stream.
pub struct Lexer<'a> {
    input: &'a [char],
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [char]) -> Self {
        Self { input }
    }

    /// Skips characters that cannot start a term.
    fn trim_non_term(&mut self) {
        while !self.input.is_empty() && !self.input[0].is_ascii_alphanumeric() {
            self.input = &self.input[1..];
        }
    }

    /// Chops characters from the input while a predicate remains true.
    fn chop_while<P>(&mut self, mut predicate: P) -> &'a [char]
    where
        P: FnMut(&char) -> bool,
    {
        let mut n = 0;
        while n < self.input.len() && predicate(&self.input[n]) {
            n += 1;
        }
        let token = &self.input[..n];
        self.input = &self.input[n..];
        token
    }

    fn next_token(&mut self) -> Option<String> {
        self.trim_non_term();
        if self.input.is_empty() {
            return None;
        }
        let term: String = self
            .chop_while(|c| c.is_ascii_alphanumeric())
            .iter()
            .collect();
        if term.is_empty() {
            None
        } else {
            Some(term.to_ascii_lowercase())
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Splits `text` into normalized terms, preserving order of appearance.
/// Positions in a document are indices into this returned sequence.
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    Lexer::new(&chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_non_alphanumeric_and_lowercases() {
        let tokens = tokenize("The quick-brown FOX jumps! 42 times.");
        assert_eq!(
            tokens,
            vec!["the", "quick", "brown", "fox", "jumps", "42", "times"]
        );
    }

    #[test]
    fn preserves_order_of_appearance() {
        let tokens = tokenize("b a c");
        assert_eq!(tokens, vec!["b", "a", "c"]);
    }

    #[test]
    fn drops_empty_and_punctuation_only_input() {
        assert!(tokenize("   !!! --- ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn is_pure_and_idempotent_under_relowercasing() {
        let text = "Quick Brown Fox 123";
        let once = tokenize(text);
        let twice = tokenize(&once.join(" "));
        assert_eq!(once, twice);
    }

    #[test]
    fn does_not_merge_digits_and_letters_across_a_separator() {
        let tokens = tokenize("v2.final");
        assert_eq!(tokens, vec!["v2", "final"]);
    }
}
