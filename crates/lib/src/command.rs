//! Command validation: turn the caller's free-form string into an argv for the tool.
//! The tool is never run through a shell; the character denylist is a second layer on top of that.

/// Shell metacharacters that are never accepted in a command.
pub const FORBIDDEN_CHARS: &[char] = &[';', '&', '|', '`', '$', '<', '>'];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid characters in command. Forbidden [;&|`$<>]")]
    ForbiddenCharacters,
    #[error("Command cannot be empty")]
    Empty,
}

/// Strip line breaks (`\r\n`, then `\n`). A command is always a single line.
pub fn normalize(raw: &str) -> String {
    raw.replace("\r\n", "").replace('\n', "")
}

/// Reject forbidden characters and empty commands.
pub fn validate(command: &str) -> Result<(), CommandError> {
    if command.contains(FORBIDDEN_CHARS) {
        return Err(CommandError::ForbiddenCharacters);
    }
    if command.trim().is_empty() {
        return Err(CommandError::Empty);
    }
    Ok(())
}

/// Whitespace tokenization; no quoting rules.
pub fn split_args(command: &str) -> Vec<String> {
    command.split_whitespace().map(String::from).collect()
}

/// Normalize, validate and split. The returned argv goes straight to the runner.
pub fn sanitize(raw: &str) -> Result<Vec<String>, CommandError> {
    let command = normalize(raw);
    log::debug!("got command: {}", command);
    validate(&command)?;
    Ok(split_args(&command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_forbidden_char_is_rejected() {
        for c in FORBIDDEN_CHARS {
            let cmd = format!("-i in.mp4 {} out.mp4", c);
            assert_eq!(
                sanitize(&cmd),
                Err(CommandError::ForbiddenCharacters),
                "char {:?}",
                c
            );
        }
    }

    #[test]
    fn newline_smuggling_is_still_rejected() {
        assert_eq!(
            sanitize("-version\n; rm -rf /"),
            Err(CommandError::ForbiddenCharacters)
        );
    }

    #[test]
    fn normalize_drops_crlf_and_lf() {
        assert_eq!(normalize("-i\r\na.mp4\nb.mp4"), "-ia.mp4b.mp4");
    }

    #[test]
    fn benign_command_splits_on_whitespace() {
        let argv = sanitize("-i  /media/in.mov\t-vf scale=640:-1 /cache/out.mp4").unwrap();
        assert_eq!(
            argv,
            vec!["-i", "/media/in.mov", "-vf", "scale=640:-1", "/cache/out.mp4"]
        );
    }

    #[test]
    fn empty_and_blank_commands_are_rejected() {
        assert_eq!(sanitize(""), Err(CommandError::Empty));
        assert_eq!(sanitize("  \r\n \n"), Err(CommandError::Empty));
    }

    #[test]
    fn forbidden_message_names_the_rule() {
        assert_eq!(
            CommandError::ForbiddenCharacters.to_string(),
            "Invalid characters in command. Forbidden [;&|`$<>]"
        );
    }
}
