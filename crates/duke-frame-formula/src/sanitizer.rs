//! Column-name sanitizer
//!
//! Column names in user data are free text: `Revenue Growth`, `Price ($)`,
//! `2023`, `IF`. Before parsing, every column name that occurs in the
//! expression is rewritten to a safe identifier (ASCII letters, digits and
//! underscores) so the parser never needs to know the table schema.
//!
//! Quoted string literals are opaque: nothing between a pair of matching
//! quotes is ever rewritten. Longer column names win over their prefixes, so
//! `Revenue Growth` is never read as `Revenue` followed by `Growth`.

use ahash::AHashSet;
use lazy_regex::regex;
use regex::{Regex, RegexBuilder};
use tracing::trace;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::CONSTANTS;
use crate::functions::FunctionRegistry;
use crate::parser::KEYWORDS;

/// Upper bound for the compiled alternation of column names
const MATCHER_SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// Bijective mapping from column names to the safe identifiers that replace them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(String, String)>,
}

impl ColumnMapping {
    /// Safe identifier for a column name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(original, _)| original == column)
            .map(|(_, safe)| safe.as_str())
    }

    /// Column name behind a safe identifier
    pub fn original(&self, safe: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, id)| id == safe)
            .map(|(original, _)| original.as_str())
    }

    /// `(column name, safe identifier)` pairs in order of first occurrence
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(original, safe)| (original.as_str(), safe.as_str()))
    }

    /// All safe identifiers
    pub fn safe_identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(_, safe)| safe.as_str())
    }

    /// Number of mapped columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no column was referenced
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite an expression with this mapping only
    ///
    /// Applying the mapping to its own sanitized output returns it unchanged.
    pub fn apply(&self, expression: &str) -> FormulaResult<String> {
        let functions = FunctionRegistry::new().function_names();
        let segments = split_quoted(expression);
        let references = find_references(
            &segments,
            self.entries.iter().map(|(o, _)| o.as_str()),
            &functions,
        )?;
        Ok(substitute(&segments, &references, self))
    }

    fn contains_safe(&self, candidate: &str) -> bool {
        self.entries.iter().any(|(_, safe)| safe == candidate)
    }

    fn insert(&mut self, original: &str, safe: String) {
        self.entries.push((original.to_string(), safe));
    }
}

/// Rewrite every column name in `expression` into a safe identifier
///
/// Returns the rewritten expression and the mapping that produced it. An
/// expression that references no columns comes back unchanged with an empty
/// mapping.
///
/// # Example
/// ```rust
/// use duke_frame_formula::sanitize;
///
/// let (text, mapping) = sanitize("Revenue Growth * 2", ["Revenue", "Revenue Growth"]).unwrap();
/// assert_eq!(text, "Revenue_Growth * 2");
/// assert_eq!(mapping.get("Revenue Growth"), Some("Revenue_Growth"));
/// ```
pub fn sanitize<'a, I>(expression: &str, column_names: I) -> FormulaResult<(String, ColumnMapping)>
where
    I: IntoIterator<Item = &'a str>,
{
    let columns: AHashSet<&str> = column_names
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect();
    let functions = FunctionRegistry::new().function_names();
    let segments = split_quoted(expression);
    let references = find_references(&segments, columns.iter().copied(), &functions)?;

    let mut mapping = ColumnMapping::default();
    if references.is_empty() {
        return Ok((expression.to_string(), mapping));
    }

    let residual = residual_identifiers(&segments, &references);
    for reference in &references {
        if mapping.get(reference.name).is_some() {
            continue;
        }
        let safe = safe_identifier(reference.name, |candidate| {
            is_reserved(candidate, &functions)
                || (candidate != reference.name && columns.contains(candidate))
                || residual.contains(candidate)
                || mapping.contains_safe(candidate)
        });
        trace!(column = reference.name, safe = %safe, "mapped column name");
        mapping.insert(reference.name, safe);
    }

    Ok((substitute(&segments, &references, &mapping), mapping))
}

/// A piece of the expression: code that may be rewritten, or a quoted literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Code(&'a str),
    Quoted(&'a str),
}

/// One column-name occurrence inside a code segment
#[derive(Debug, Clone, Copy)]
struct Reference<'a> {
    segment: usize,
    start: usize,
    end: usize,
    name: &'a str,
}

/// Identifier characters as the parser sees them
pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split on single- and double-quoted runs, honouring backslash escapes
///
/// An unterminated quote swallows the rest of the input; the parser reports it.
fn split_quoted(expression: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut chars = expression.char_indices();

    while let Some((i, c)) = chars.next() {
        if c != '"' && c != '\'' {
            continue;
        }
        if i > start {
            segments.push(Segment::Code(&expression[start..i]));
        }

        let mut end = expression.len();
        let mut escaped = false;
        for (j, d) in chars.by_ref() {
            if escaped {
                escaped = false;
            } else if d == '\\' {
                escaped = true;
            } else if d == c {
                end = j + d.len_utf8();
                break;
            }
        }
        segments.push(Segment::Quoted(&expression[i..end]));
        start = end;
    }

    if start < expression.len() {
        segments.push(Segment::Code(&expression[start..]));
    }
    segments
}

/// Regex alternative for one column name with its own boundary assertions
///
/// `\b` where the name starts (or ends) with an identifier character, `\B`
/// where it does not; either way the neighbouring character must not be an
/// identifier character.
fn boundary_pattern(name: &str) -> String {
    let lead = if name.starts_with(is_ident_char) { r"\b" } else { r"\B" };
    let tail = if name.ends_with(is_ident_char) { r"\b" } else { r"\B" };
    format!("{}{}{}", lead, regex::escape(name), tail)
}

/// Build one alternation over the candidate names, longest first
fn build_matcher(mut names: Vec<&str>) -> FormulaResult<Regex> {
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let pattern = names
        .iter()
        .map(|name| boundary_pattern(name))
        .collect::<Vec<_>>()
        .join("|");

    RegexBuilder::new(&pattern)
        .size_limit(MATCHER_SIZE_LIMIT)
        .build()
        .map_err(|e| FormulaError::syntax(format!("too many column references: {}", e), 0))
}

/// Find every whole-token column-name occurrence in the code segments
fn find_references<'s, 'n, I>(
    segments: &[Segment<'s>],
    names: I,
    functions: &AHashSet<String>,
) -> FormulaResult<Vec<Reference<'s>>>
where
    I: IntoIterator<Item = &'n str>,
{
    // Only names that can possibly occur go into the matcher
    let candidates: Vec<&str> = names
        .into_iter()
        .filter(|name| {
            segments
                .iter()
                .any(|s| matches!(s, Segment::Code(code) if code.contains(name)))
        })
        .collect();
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let matcher = build_matcher(candidates)?;
    let mut references = Vec::new();
    for (index, segment) in segments.iter().enumerate() {
        let Segment::Code(code) = segment else {
            continue;
        };
        for m in matcher.find_iter(code) {
            // A column sharing a function's name is still a call when followed by '('
            if is_function(m.as_str(), functions) && code[m.end()..].trim_start().starts_with('(') {
                continue;
            }
            if inside_number(code, m.start(), m.end()) {
                continue;
            }
            references.push(Reference {
                segment: index,
                start: m.start(),
                end: m.end(),
                name: m.as_str(),
            });
        }
    }
    Ok(references)
}

/// Whether `code[start..end]` is part of a larger numeric literal
///
/// Covers the fraction in `0.5` and `.5`, the integer part in `5.0` and the
/// exponent in `1e-5`, so a column named `5` never rewrites a number.
fn inside_number(code: &str, start: usize, end: usize) -> bool {
    let matched = &code[start..end];
    let before = &code[..start];
    let after = &code[end..];

    if matched.starts_with(|c: char| c.is_ascii_digit()) {
        if before.ends_with('.') {
            return true;
        }
        let mantissa = before
            .strip_suffix(|c: char| c == '+' || c == '-')
            .and_then(|s| s.strip_suffix(|c: char| c == 'e' || c == 'E'));
        if let Some(mantissa) = mantissa {
            let digits = mantissa
                .trim_end_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '_');
            let run = &mantissa[digits.len()..];
            if run.contains(|c: char| c.is_ascii_digit()) && !digits.ends_with(is_ident_char) {
                return true;
            }
        }
    }

    matched.ends_with(|c: char| c.is_ascii_digit()) && after.starts_with('.')
}

/// Identifiers left in the code once column references are blanked out
fn residual_identifiers<'s>(segments: &[Segment<'s>], references: &[Reference<'s>]) -> AHashSet<String> {
    let identifier = regex!(r"\b[^\W\d]\w*");
    let mut residual = AHashSet::new();

    for (index, segment) in segments.iter().enumerate() {
        let Segment::Code(code) = segment else {
            continue;
        };
        let mut blanked = code.to_string();
        for reference in references.iter().filter(|r| r.segment == index) {
            blanked.replace_range(reference.start..reference.end, &" ".repeat(reference.end - reference.start));
        }
        residual.extend(identifier.find_iter(&blanked).map(|m| m.as_str().to_string()));
    }
    residual
}

fn is_function(name: &str, functions: &AHashSet<String>) -> bool {
    functions.contains(&name.to_ascii_uppercase())
}

fn is_reserved(candidate: &str, functions: &AHashSet<String>) -> bool {
    is_function(candidate, functions)
        || CONSTANTS
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(candidate))
        || KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(candidate))
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Turn a free-text column name into an identifier stem
fn identifier_stem(name: &str) -> String {
    if is_valid_identifier(name) {
        return name.to_string();
    }

    let mut stem = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c);
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }

    let trimmed = stem.trim_matches('_');
    let mut stem = if trimmed.is_empty() {
        "col".to_string()
    } else {
        trimmed.to_string()
    };
    if stem.starts_with(|c: char| c.is_ascii_digit()) {
        stem.insert_str(0, "c_");
    }
    stem
}

/// Pick the first stem variant (`stem`, `stem_1`, `stem_2`, ...) that is not taken
fn safe_identifier(name: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    let stem = identifier_stem(name);
    if !taken(&stem) {
        return stem;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", stem, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Reassemble the expression with references replaced
fn substitute(segments: &[Segment<'_>], references: &[Reference<'_>], mapping: &ColumnMapping) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Quoted(text) => out.push_str(text),
            Segment::Code(code) => {
                let mut last = 0;
                for reference in references.iter().filter(|r| r.segment == index) {
                    out.push_str(&code[last..reference.start]);
                    out.push_str(mapping.get(reference.name).unwrap_or(reference.name));
                    last = reference.end;
                }
                out.push_str(&code[last..]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(expression: &str, columns: &[&str]) -> (String, ColumnMapping) {
        sanitize(expression, columns.iter().copied()).unwrap()
    }

    #[test]
    fn test_identifier_columns_keep_their_name() {
        let (text, mapping) = run("Sales / Volume", &["Sales", "Volume"]);
        assert_eq!(text, "Sales / Volume");
        assert_eq!(mapping.get("Sales"), Some("Sales"));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_longest_name_wins() {
        let (text, mapping) = run(
            "Revenue Growth * 2 + Revenue",
            &["Revenue", "Revenue Growth"],
        );
        assert_eq!(text, "Revenue_Growth * 2 + Revenue");
        assert_eq!(mapping.get("Revenue Growth"), Some("Revenue_Growth"));
        assert_eq!(mapping.get("Revenue"), Some("Revenue"));
    }

    #[test]
    fn test_longer_name_falls_back_when_boundary_fails() {
        let (text, _) = run("Revenue Growthy", &["Revenue", "Revenue Growth"]);
        assert_eq!(text, "Revenue Growthy");
    }

    #[test]
    fn test_punctuation_in_names() {
        let (text, mapping) = run("Price ($) * Qty-Sold", &["Price ($)", "Qty-Sold"]);
        assert_eq!(text, "Price * Qty_Sold");
        assert_eq!(mapping.original("Price"), Some("Price ($)"));
        assert_eq!(mapping.original("Qty_Sold"), Some("Qty-Sold"));
    }

    #[test]
    fn test_numeric_names_get_a_letter_prefix() {
        let (text, mapping) = run("2023 + 2024", &["2023"]);
        assert_eq!(text, "c_2023 + 2024");
        assert_eq!(mapping.get("2023"), Some("c_2023"));
    }

    #[test]
    fn test_whole_token_only() {
        let (text, mapping) = run("Sales2 + XSales", &["Sales"]);
        assert_eq!(text, "Sales2 + XSales");
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_string_literals_are_untouched() {
        let (text, _) = run(
            r#"IF(Status, "Status + Revenue Growth", 'it\'s Status')"#,
            &["Status", "Revenue Growth"],
        );
        assert_eq!(text, r#"IF(Status, "Status + Revenue Growth", 'it\'s Status')"#);
    }

    #[test]
    fn test_unterminated_quote_is_opaque() {
        let (text, _) = run("Sales + 'Sales", &["Sales"]);
        assert_eq!(text, "Sales + 'Sales");
    }

    #[test]
    fn test_function_named_column() {
        let (text, mapping) = run("SUM(SUM) + IF", &["SUM", "IF"]);
        assert_eq!(mapping.get("SUM"), Some("SUM_1"));
        assert_eq!(mapping.get("IF"), Some("IF_1"));
        assert_eq!(text, "SUM(SUM_1) + IF_1");
    }

    #[test]
    fn test_constants_and_keywords_are_reserved() {
        let (text, mapping) = run("E * PI + lambda", &["E", "lambda"]);
        assert_eq!(mapping.get("E"), Some("E_1"));
        assert_eq!(mapping.get("lambda"), Some("lambda_1"));
        assert_eq!(text, "E_1 * PI + lambda_1");
    }

    #[test]
    fn test_collisions_get_numeric_suffix() {
        let (text, mapping) = run("A B + A_B + A-B", &["A B", "A_B", "A-B"]);
        assert_eq!(mapping.get("A_B"), Some("A_B"));
        assert_eq!(mapping.get("A B"), Some("A_B_1"));
        assert_eq!(mapping.get("A-B"), Some("A_B_2"));
        assert_eq!(text, "A_B_1 + A_B + A_B_2");
    }

    #[test]
    fn test_residual_identifiers_are_not_reused() {
        let (text, mapping) = run("Unit Price + Unit_Price", &["Unit Price"]);
        assert_eq!(mapping.get("Unit Price"), Some("Unit_Price_1"));
        assert_eq!(text, "Unit_Price_1 + Unit_Price");
    }

    #[test]
    fn test_no_columns_is_identity() {
        let (text, mapping) = run("1 + 2 * 'x'", &["Sales"]);
        assert_eq!(text, "1 + 2 * 'x'");
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let columns = ["Revenue", "Revenue Growth", "A B", "A_B"];
        let expression = "Revenue Growth - Revenue + A B * A_B";
        let (text, mapping) = run(expression, &columns);
        assert_eq!(mapping.apply(expression).unwrap(), text);
        assert_eq!(mapping.apply(&text).unwrap(), text);
    }

    #[test]
    fn test_mapping_is_bijective() {
        let columns = ["a b", "a-b", "a.b", "a__b"];
        let (_, mapping) = run("a b + a-b + a.b + a__b", &columns);
        let safe: AHashSet<&str> = mapping.safe_identifiers().collect();
        assert_eq!(safe.len(), 4);
        for (original, id) in mapping.iter() {
            assert_eq!(mapping.original(id), Some(original));
        }
    }

    #[test]
    fn test_numeric_names_leave_number_literals_alone() {
        let (text, _) = run("Sales * 0.5", &["Sales", "5"]);
        assert_eq!(text, "Sales * 0.5");

        let (text, mapping) = run("1.5 + 5", &["5"]);
        assert_eq!(text, "1.5 + c_5");
        assert_eq!(mapping.get("5"), Some("c_5"));

        let (text, _) = run("5.25 * .5 + 2e-5 + 3.0E+5 + 5", &["5", "25"]);
        assert_eq!(text, "5.25 * .5 + 2e-5 + 3.0E+5 + c_5");

        let (text, _) = run("Rate1e-5", &["Rate1e", "5"]);
        assert_eq!(text, "Rate1e-c_5");
    }

    #[test]
    fn test_split_quoted() {
        let segments = split_quoted(r#"a + "b\"c" + 'd'"#);
        assert_eq!(
            segments,
            vec![
                Segment::Code("a + "),
                Segment::Quoted(r#""b\"c""#),
                Segment::Code(" + "),
                Segment::Quoted("'d'"),
            ]
        );
    }
}
