use std::io::{BufRead, Write};

/// Yes/no questions put to the operator.
pub trait Prompter: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Asks on stdin until it gets a y/n answer. EOF counts as "no".
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&self, question: &str) -> bool {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            print!("{question} [y/n] ");
            let _ = std::io::stdout().flush();
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }
            if let Some(answer) = parse_answer(&line) { return answer; }
            println!("Please answer y or n.");
        }
    }
}

pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// What to do when the target language already has a published revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewritePolicy {
    Never,
    Always,
    Prompt,
}

impl RewritePolicy {
    /// `never` wins over `always`.
    pub fn from_flags(always: bool, never: bool) -> Self {
        match (always, never) {
            (_, true) => Self::Never,
            (true, false) => Self::Always,
            (false, false) => Self::Prompt,
        }
    }

    pub fn should_rewrite(self, prompter: &dyn Prompter) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::Prompt => prompter.confirm("Should I upload the subtitles anyway?"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Scripted;
    use super::*;

    #[test]
    fn never_overrides_always() {
        assert_eq!(RewritePolicy::from_flags(true, true), RewritePolicy::Never);
        assert_eq!(RewritePolicy::from_flags(true, false), RewritePolicy::Always);
        assert_eq!(RewritePolicy::from_flags(false, true), RewritePolicy::Never);
        assert_eq!(RewritePolicy::from_flags(false, false), RewritePolicy::Prompt);
    }

    #[test]
    fn only_prompt_policy_asks() {
        let p = Scripted::new(&[true]);
        assert!(!RewritePolicy::Never.should_rewrite(&p));
        assert!(RewritePolicy::Always.should_rewrite(&p));
        assert_eq!(p.asked_count(), 0);
        assert!(RewritePolicy::Prompt.should_rewrite(&p));
        assert_eq!(p.asked_count(), 1);
    }

    #[test]
    fn answers() {
        assert_eq!(parse_answer(" Y\n"), Some(true));
        assert_eq!(parse_answer("no"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
    }
}
