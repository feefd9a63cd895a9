//! Folds a lexed token stream into a [`Pipeline`] of [`Command`]s.
//!
//! The lexer never recognizes operators itself, so every `|`, `<`, `>`,
//! `>>`, `&` reaching here is a genuine operator use (a quoted one lexes
//! to the same spelling but the lexer already treats it as an ordinary
//! word — see `lexer::Token::kind`'s doc comment).

use crate::error::ShellError;
use crate::lexer::{Token, TokenKind};

/// A single external-or-builtin invocation with its redirection targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub argv: Vec<String>,
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub append_mode: bool,
}

/// An ordered, non-empty chain of [`Command`]s connected by pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub background: bool,
}

impl Pipeline {
    /// The input redirection that actually takes effect: only the first
    /// command's, per spec.
    pub fn effective_input(&self) -> Option<&str> {
        self.commands.first().and_then(|c| c.input_file.as_deref())
    }

    /// The output redirection that actually takes effect: only the last
    /// command's, per spec.
    pub fn effective_output(&self) -> Option<(&str, bool)> {
        self.commands
            .last()
            .and_then(|c| c.output_file.as_deref().map(|p| (p, c.append_mode)))
    }
}

/// Parses a full token stream into a [`Pipeline`].
pub fn parse(tokens: &[Token]) -> Result<Pipeline, ShellError> {
    let mut tokens = tokens.to_vec();
    let mut background = false;

    if let Some(last) = tokens.last() {
        if last.kind() == TokenKind::Amp {
            background = true;
            tokens.pop();
        }
    }

    // A bare `&` anywhere else in the (now trailing-& stripped) stream is
    // an error — it may only ever appear at the very end of the pipeline.
    if tokens.iter().any(|t| t.kind() == TokenKind::Amp) {
        return Err(ShellError::AmpersandNotAtEnd);
    }

    let segments: Vec<&[Token]> = split_on_pipe(&tokens);
    if segments.is_empty() {
        return Err(ShellError::SyntaxErrorNear("|".to_string()));
    }

    let mut commands = Vec::with_capacity(segments.len());
    for segment in segments {
        commands.push(reduce_segment(segment)?);
    }

    Ok(Pipeline { commands, background })
}

fn split_on_pipe(tokens: &[Token]) -> Vec<&[Token]> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind() == TokenKind::Pipe {
            segments.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    segments.push(&tokens[start..]);
    segments
}

fn reduce_segment(segment: &[Token]) -> Result<Command, ShellError> {
    let mut cmd = Command::default();
    let mut i = 0;
    let mut saw_input = false;
    let mut saw_output = false;

    while i < segment.len() {
        let tok = &segment[i];
        match tok.kind() {
            TokenKind::Less => {
                if saw_input {
                    return Err(ShellError::MultipleInputRedirections);
                }
                let operand = segment.get(i + 1).ok_or_else(|| {
                    ShellError::SyntaxErrorNear("<".to_string())
                })?;
                cmd.input_file = Some(operand.text.clone());
                saw_input = true;
                i += 2;
            }
            TokenKind::Great => {
                if saw_output {
                    return Err(ShellError::MultipleOutputRedirections);
                }
                let operand = segment.get(i + 1).ok_or_else(|| {
                    ShellError::SyntaxErrorNear(">".to_string())
                })?;
                cmd.output_file = Some(operand.text.clone());
                cmd.append_mode = false;
                saw_output = true;
                i += 2;
            }
            TokenKind::DGreat => {
                if saw_output {
                    return Err(ShellError::MultipleOutputRedirections);
                }
                let operand = segment.get(i + 1).ok_or_else(|| {
                    ShellError::SyntaxErrorNear(">>".to_string())
                })?;
                cmd.output_file = Some(operand.text.clone());
                cmd.append_mode = true;
                saw_output = true;
                i += 2;
            }
            TokenKind::Amp => {
                // Trailing `&` was already stripped by `parse`; any `&`
                // reaching here is mid-segment.
                return Err(ShellError::AmpersandNotAtEnd);
            }
            TokenKind::Pipe => unreachable!("segments are already split on '|'"),
            TokenKind::Word => {
                cmd.argv.push(tok.text.clone());
                i += 1;
            }
        }
    }

    if cmd.argv.is_empty() {
        return Err(ShellError::SyntaxErrorNear("|".to_string()));
    }

    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{lex, ProcessEnv};

    fn parse_str(s: &str) -> Result<Pipeline, ShellError> {
        let toks = lex(s, &ProcessEnv).unwrap();
        parse(&toks)
    }

    #[test]
    fn single_command() {
        let p = parse_str("echo hello world").unwrap();
        assert_eq!(p.commands.len(), 1);
        assert_eq!(p.commands[0].argv, vec!["echo", "hello", "world"]);
        assert!(!p.background);
    }

    #[test]
    fn pipeline_of_three() {
        let p = parse_str("ls | grep foo | wc -l").unwrap();
        assert_eq!(p.commands.len(), 3);
        assert_eq!(p.commands[1].argv, vec!["grep", "foo"]);
    }

    #[test]
    fn redirections() {
        let p = parse_str("cat < in.txt").unwrap();
        assert_eq!(p.commands[0].input_file.as_deref(), Some("in.txt"));

        let p = parse_str("echo hi > out.txt").unwrap();
        assert_eq!(p.commands[0].output_file.as_deref(), Some("out.txt"));
        assert!(!p.commands[0].append_mode);

        let p = parse_str("echo hi >> out.txt").unwrap();
        assert!(p.commands[0].append_mode);
    }

    #[test]
    fn trailing_background() {
        let p = parse_str("sleep 10 &").unwrap();
        assert!(p.background);
        assert_eq!(p.commands[0].argv, vec!["sleep", "10"]);
    }

    #[test]
    fn pipeline_effective_redirections_only_first_and_last() {
        let p = parse_str("cat < in.txt | grep x | wc -l > out.txt").unwrap();
        assert_eq!(p.effective_input(), Some("in.txt"));
        assert_eq!(p.effective_output(), Some(("out.txt", false)));
    }

    #[test]
    fn missing_redirection_operand_errors() {
        assert_eq!(
            parse_str("cat <"),
            Err(ShellError::SyntaxErrorNear("<".to_string()))
        );
    }

    #[test]
    fn double_input_redirection_errors() {
        assert_eq!(
            parse_str("cat < a < b"),
            Err(ShellError::MultipleInputRedirections)
        );
    }

    #[test]
    fn empty_pipeline_segment_errors() {
        assert_eq!(
            parse_str("| cat"),
            Err(ShellError::SyntaxErrorNear("|".to_string()))
        );
    }

    #[test]
    fn ampersand_not_at_end_errors() {
        assert_eq!(
            parse_str("echo a & echo b"),
            Err(ShellError::AmpersandNotAtEnd)
        );
    }

    #[test]
    fn quoted_pipe_is_literal_argument() {
        let p = parse_str(r#"echo "|""#).unwrap();
        assert_eq!(p.commands.len(), 1);
        assert_eq!(p.commands[0].argv, vec!["echo", "|"]);
    }
}
