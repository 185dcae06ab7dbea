use crate::error::AssembleResult;
use crate::inject::render_injection;
use crate::payload::Payload;
use crate::shell::split_at_marker;

/// Fixed closing markup appended after the engine block, independent of all
/// inputs. Engines that open a `<script>` element in the shell are expected
/// to close it themselves.
pub const CLOSING_MARKUP: &str = "</body></html>";

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Preserve the shell text after the marker (normally whitespace)
    /// between the injection block and the engine.
    pub keep_suffix: bool,
    /// Spaces prefixed to every injected line.
    pub indent: usize,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            keep_suffix: false,
            indent: 0,
        }
    }
}

/// Assembles the final dashboard document:
/// shell prefix (up to and including the marker), the injection block for
/// `payload`, optionally the shell suffix, the engine byte-for-byte, then
/// [`CLOSING_MARKUP`]. Pure: neither `shell` nor `engine` is modified, and
/// identical inputs always produce identical output.
pub fn assemble(
    shell: &str,
    marker: &str,
    payload: &Payload,
    engine: &str,
    options: &AssembleOptions,
) -> AssembleResult<String> {
    let split = split_at_marker(shell, marker)?;
    let injection = render_injection(payload, options.indent)?;

    let suffix = if options.keep_suffix { split.suffix } else { "" };

    let mut document = String::with_capacity(
        split.prefix.len() + injection.len() + suffix.len() + engine.len() + CLOSING_MARKUP.len(),
    );
    document.push_str(split.prefix);
    document.push_str(&injection);
    document.push_str(suffix);
    document.push_str(engine);
    document.push_str(CLOSING_MARKUP);

    Ok(document)
}
