//! Output formatting for search hits

use crate::index::types::Position;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// How hits are rendered
#[derive(Debug, Clone, Copy)]
pub struct HitFormat {
    /// Symbols of surrounding text shown on each side of a hit
    pub context: usize,
    /// Stop after this many hits
    pub limit: Option<usize>,
}

impl Default for HitFormat {
    fn default() -> Self {
        Self {
            context: 10,
            limit: None,
        }
    }
}

/// Print hits to stdout, one per line, with the match highlighted
pub fn print_hits(
    text: &[u8],
    query_len: usize,
    positions: &[Position],
    format: HitFormat,
    color: bool,
) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_hits(&mut stdout, text, query_len, positions, format)
}

/// Render hits as `offset:before[match]after`
pub fn write_hits<W: WriteColor>(
    out: &mut W,
    text: &[u8],
    query_len: usize,
    positions: &[Position],
    format: HitFormat,
) -> io::Result<()> {
    let shown = format.limit.unwrap_or(usize::MAX).min(positions.len());
    for &pos in &positions[..shown] {
        let start = pos as usize;
        let end = (start + query_len).min(text.len());
        let before = start.saturating_sub(format.context);
        let after = (end + format.context).min(text.len());

        // Offset
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}", pos)?;
        out.reset()?;
        write!(out, ":")?;

        if before > 0 {
            write!(out, "...")?;
        }
        out.write_all(&text[before..start])?;

        // The match itself (highlighted)
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        out.write_all(&text[start..end])?;
        out.reset()?;

        out.write_all(&text[end..after])?;
        if after < text.len() {
            write!(out, "...")?;
        }
        writeln!(out)?;
    }

    if shown < positions.len() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        writeln!(out, "-- {} more hits", positions.len() - shown)?;
        out.reset()?;
    }
    Ok(())
}

/// Print the hit count (for --count)
pub fn print_count(query: &[u8], count: usize, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
    stdout.write_all(query)?;
    stdout.reset()?;
    write!(stdout, ":")?;
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    writeln!(stdout, "{}", count)?;
    stdout.reset()?;
    Ok(())
}
