//! Interactive multiselect over the fully replaceable checkouts.
//!
//! Selection commands are comma separated: `N` selects item N, `A-B` a range,
//! `*` everything, and a leading `-` deselects instead.

use anyhow::Context;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};

const PROMPT: &str = "Replace>> ";
const CONFIRM_NOTHING: &str = "Are you sure you don't want to replace any packages (Y/n)? ";

/// Apply one line of selection commands to `selected` (0-based indices).
///
/// Returns the tokens that could not be parsed or were out of range.
pub fn apply_commands(line: &str, count: usize, selected: &mut BTreeSet<usize>) -> Vec<String> {
    let mut invalid = Vec::new();
    for token in line.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (deselect, body) = match token.strip_prefix('-') {
            Some(rest) => (true, rest.trim()),
            None => (false, token),
        };
        let Some(range) = parse_range(body, count) else {
            invalid.push(token.to_string());
            continue;
        };
        for idx in range {
            if deselect {
                selected.remove(&idx);
            } else {
                selected.insert(idx);
            }
        }
    }
    invalid
}

/// 0-based indices for `*`, `N` or `A-B` (1-based, inclusive).
fn parse_range(body: &str, count: usize) -> Option<std::ops::Range<usize>> {
    if body == "*" {
        return Some(0..count);
    }
    let (lo, hi) = match body.split_once('-') {
        Some((a, b)) => (a.trim().parse::<usize>().ok()?, b.trim().parse::<usize>().ok()?),
        None => {
            let n = body.parse::<usize>().ok()?;
            (n, n)
        }
    };
    if lo == 0 || lo > hi || hi > count {
        return None;
    }
    Some(lo - 1..hi)
}

/// Run the selection dialogue.
///
/// `Ok(None)` means the input ended and the user cancelled; `Ok(Some(vec![]))`
/// means they confirmed replacing nothing. Indices are sorted and 0-based.
pub fn multiselect<R: BufRead, W: Write>(
    items: &[String],
    mut input: R,
    mut output: W,
) -> anyhow::Result<Option<Vec<usize>>> {
    writeln!(output, "Select the checkouts to replace with binary packages:")?;
    for (i, item) in items.iter().enumerate() {
        writeln!(output, "  {:>3}) {}", i + 1, item)?;
    }
    writeln!(
        output,
        "Enter e.g. `1`, `2-4`, `*` or `-3` (comma separated); an empty line submits."
    )?;

    let mut selected = BTreeSet::new();
    loop {
        write_selection(&mut output, items, &selected)?;
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let Some(line) = read_line(&mut input)? else {
            return Ok(None);
        };
        if !line.trim().is_empty() {
            for token in apply_commands(&line, items.len(), &mut selected) {
                writeln!(output, "Invalid selection: {token}")?;
            }
            continue;
        }

        if !selected.is_empty() {
            return Ok(Some(selected.into_iter().collect()));
        }
        match confirm_nothing(&mut input, &mut output)? {
            Some(true) => return Ok(Some(vec![])),
            Some(false) => continue,
            None => return Ok(None),
        }
    }
}

fn write_selection<W: Write>(
    output: &mut W,
    items: &[String],
    selected: &BTreeSet<usize>,
) -> anyhow::Result<()> {
    writeln!(output, "{} selected.", selected.len())?;
    for &idx in selected {
        writeln!(output, "  * {}", items[idx])?;
    }
    Ok(())
}

fn confirm_nothing<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<Option<bool>> {
    loop {
        write!(output, "{CONFIRM_NOTHING}")?;
        output.flush()?;
        let Some(answer) = read_line(input)? else {
            return Ok(None);
        };
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(Some(true)),
            "n" | "no" => return Ok(Some(false)),
            _ => writeln!(output, "Please answer y or n.")?,
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).context("read selection")?;
    Ok((n > 0).then_some(line))
}
