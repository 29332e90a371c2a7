//! Handing URLs to the desktop.

use std::io;
use std::process::Command;

use urlstream_core::Url;

/// The string handed to the platform opener for `url`.
///
/// Text containing `@` but no `:` is taken as an email address and gets a
/// `mailto:` prefix.
///
/// # Example
///
/// ```
/// use urlstream::{Url, launch_target};
///
/// assert_eq!(launch_target(&Url::parse("jo@example.com")), "mailto:jo@example.com");
/// assert_eq!(launch_target(&Url::parse("https://example.com")), "https://example.com");
/// ```
#[must_use]
pub fn launch_target(url: &Url) -> String {
    let rendered = url.to_url_string(true);
    if rendered.contains('@') && !rendered.contains(':') {
        format!("mailto:{rendered}")
    } else {
        rendered
    }
}

/// Open `url` with the platform's default handler.
///
/// Waits for the opener command to return, not for the browser.
///
/// # Errors
///
/// Returns an error if the opener cannot be started or exits unsuccessfully.
pub fn launch_in_default_browser(url: &Url) -> io::Result<()> {
    let target = launch_target(url);
    tracing::info!(url = %target, "opening in default browser");

    let status = opener_command(&target).status()?;
    if status.success() {
        Ok(())
    } else {
        tracing::warn!(url = %target, %status, "opener failed");
        Err(io::Error::other(format!("opener exited with {status}")))
    }
}

// Not `cmd /C start`: cmd.exe splits the target at `&`.
#[cfg(target_os = "windows")]
fn opener_command(target: &str) -> Command {
    let mut command = Command::new("rundll32");
    command.arg("url.dll,FileProtocolHandler").arg(target);
    command
}

#[cfg(target_os = "macos")]
fn opener_command(target: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(target);
    command
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener_command(target: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(target);
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_gets_mailto() {
        assert_eq!(
            launch_target(&Url::parse("someone@example.org")),
            "mailto:someone@example.org"
        );
    }

    #[test]
    fn existing_scheme_kept() {
        assert_eq!(
            launch_target(&Url::parse("mailto:someone@example.org")),
            "mailto:someone@example.org"
        );
        assert_eq!(
            launch_target(&Url::parse("http://user@example.org/")),
            "http://user@example.org/"
        );
    }

    #[test]
    fn parameters_included() {
        let url = Url::parse("https://example.org/search").with_parameter("q", "a b");
        assert_eq!(launch_target(&url), "https://example.org/search?q=a+b");
    }

    #[test]
    fn opener_passes_query_as_one_argument() {
        let url = Url::parse("http://x/p").with_parameter("a", "1").with_parameter("b", "2");
        let target = launch_target(&url);
        assert_eq!(target, "http://x/p?a=1&b=2");

        let command = opener_command(&target);
        assert_ne!(command.get_program(), "cmd");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.last().and_then(|a| a.to_str()), Some("http://x/p?a=1&b=2"));
        assert_eq!(args.iter().filter(|a| a.to_string_lossy().contains('&')).count(), 1);
    }

    #[test]
    fn opener_receives_target() {
        let command = opener_command("https://example.org/");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.last().and_then(|a| a.to_str()), Some("https://example.org/"));
    }
}
