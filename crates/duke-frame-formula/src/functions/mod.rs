//! Built-in formula functions
//!
//! Every function receives fully evaluated operands and the evaluation
//! context, and returns a scalar or a column. Names are matched
//! case-insensitively.

pub mod date;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod sequence;
pub mod statistical;
pub mod text;

use ahash::{AHashMap, AHashSet};
use duke_frame_core::Value;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;
use crate::number::Number;
use crate::operand::Operand;

/// Function implementation signature
pub type FunctionImpl =
    for<'t> fn(&[Operand<'t>], &EvaluationContext<'_>) -> FormulaResult<Operand<'t>>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Parameter names, for keyword arguments
    pub params: &'static [&'static str],
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        params: &'static [&'static str],
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            params,
            implementation,
        }
    }

    /// Check the argument count against the arity
    pub fn check_arity(&self, actual: usize) -> FormulaResult<()> {
        if actual < self.min_args {
            return Err(FormulaError::ArgumentCount {
                function: self.name.to_string(),
                expected: format!("at least {}", self.min_args),
                actual,
            });
        }
        if let Some(max) = self.max_args {
            if actual > max {
                return Err(FormulaError::ArgumentCount {
                    function: self.name.to_string(),
                    expected: format!("at most {}", max),
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("params", &self.params)
            .finish()
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_statistical_functions();
        registry.register_logical_functions();
        registry.register_info_functions();
        registry.register_text_functions();
        registry.register_date_functions();
        registry.register_lookup_functions();
        registry.register_sequence_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_ascii_uppercase(), def);
    }

    /// Upper-case names of all functions, aliases included
    pub fn function_names(&self) -> AHashSet<String> {
        self.functions.keys().cloned().collect()
    }

    /// All definitions, sorted by name
    pub fn definitions(&self) -> Vec<&FunctionDef> {
        let mut defs: Vec<&FunctionDef> = self.functions.values().collect();
        defs.sort_by_key(|def| def.name);
        defs
    }

    fn register_math_functions(&mut self) {
        const VALUES: &[&str] = &["value"];
        for (name, implementation) in [
            ("SUM", math::fn_sum as FunctionImpl),
            ("AVG", math::fn_avg),
            ("AVERAGE", math::fn_avg),
            ("MAX", math::fn_max),
            ("MIN", math::fn_min),
            ("PROD", math::fn_prod),
            ("PRODUCT", math::fn_prod),
        ] {
            self.register(FunctionDef::new(name, 1, None, VALUES, implementation));
        }

        self.register(FunctionDef::new("DIV", 2, None, &["value", "divisor"], math::fn_div));
        self.register(FunctionDef::new("ROUND", 1, Some(2), &["value", "digits"], math::fn_round));
        self.register(FunctionDef::new("ABS", 1, Some(1), VALUES, math::fn_abs));
        self.register(FunctionDef::new("SQRT", 1, Some(1), VALUES, math::fn_sqrt));
        self.register(FunctionDef::new("LN", 1, Some(1), VALUES, math::fn_ln));
        self.register(FunctionDef::new("LOG10", 1, Some(1), VALUES, math::fn_log10));
        self.register(FunctionDef::new("EXP", 1, Some(1), VALUES, math::fn_exp));
        self.register(FunctionDef::new("MOD", 2, Some(2), &["value", "divisor"], math::fn_mod));
        self.register(FunctionDef::new("POWER", 2, Some(2), &["value", "exponent"], math::fn_power));
    }

    fn register_statistical_functions(&mut self) {
        self.register(FunctionDef::new("ZSCORE", 1, Some(1), &["value"], statistical::fn_zscore));
        self.register(FunctionDef::new("NORM", 1, Some(1), &["value"], statistical::fn_zscore));
        self.register(FunctionDef::new("COUNT", 1, None, &["value"], statistical::fn_count));
        self.register(FunctionDef::new("MEDIAN", 1, Some(1), &["value"], statistical::fn_median));
        self.register(FunctionDef::new("STD", 1, Some(1), &["value"], statistical::fn_std));
        self.register(FunctionDef::new("VAR", 1, Some(1), &["value"], statistical::fn_var));
        self.register(FunctionDef::new(
            "PERCENTILE",
            2,
            Some(2),
            &["value", "q"],
            statistical::fn_percentile,
        ));
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef::new(
            "IF",
            2,
            Some(3),
            &["condition", "then", "otherwise"],
            logical::fn_if,
        ));
        self.register(FunctionDef::new("AND", 1, None, &["value"], logical::fn_and));
        self.register(FunctionDef::new("OR", 1, None, &["value"], logical::fn_or));
        self.register(FunctionDef::new("NOT", 1, Some(1), &["value"], logical::fn_not));

        const PAIR: &[&str] = &["left", "right"];
        for (name, implementation) in [
            ("EQ", logical::fn_eq as FunctionImpl),
            ("NE", logical::fn_ne),
            ("GT", logical::fn_gt),
            ("GE", logical::fn_ge),
            ("LT", logical::fn_lt),
            ("LE", logical::fn_le),
        ] {
            self.register(FunctionDef::new(name, 2, Some(2), PAIR, implementation));
        }
    }

    fn register_info_functions(&mut self) {
        self.register(FunctionDef::new("ISNULL", 1, Some(1), &["value"], info::fn_isnull));
        self.register(FunctionDef::new("COALESCE", 1, None, &["value"], info::fn_coalesce));
        self.register(FunctionDef::new(
            "FILLBLANK",
            2,
            Some(2),
            &["value", "fill"],
            info::fn_fillblank,
        ));
    }

    fn register_text_functions(&mut self) {
        self.register(FunctionDef::new("LEN", 1, Some(1), &["value"], text::fn_len));
        self.register(FunctionDef::new("LOWER", 1, Some(1), &["value"], text::fn_lower));
        self.register(FunctionDef::new("UPPER", 1, Some(1), &["value"], text::fn_upper));
        self.register(FunctionDef::new("TRIM", 1, Some(1), &["value"], text::fn_trim));
        self.register(FunctionDef::new(
            "SUBSTR",
            2,
            Some(3),
            &["value", "start", "length"],
            text::fn_substr,
        ));
        self.register(FunctionDef::new(
            "STR_REPLACE",
            3,
            Some(3),
            &["value", "old", "new"],
            text::fn_str_replace,
        ));
        self.register(FunctionDef::new("CONCAT", 1, None, &["value"], text::fn_concat));
    }

    fn register_date_functions(&mut self) {
        self.register(FunctionDef::new("YEAR", 1, Some(1), &["value"], date::fn_year));
        self.register(FunctionDef::new("MONTH", 1, Some(1), &["value"], date::fn_month));
        self.register(FunctionDef::new("DAY", 1, Some(1), &["value"], date::fn_day));
        self.register(FunctionDef::new("WEEKDAY", 1, Some(1), &["value"], date::fn_weekday));
        self.register(FunctionDef::new(
            "DATE_DIFF",
            2,
            Some(3),
            &["end", "start", "unit"],
            date::fn_date_diff,
        ));
    }

    fn register_lookup_functions(&mut self) {
        self.register(FunctionDef::new("MAP", 2, Some(2), &["value", "mapping"], lookup::fn_map));
        self.register(FunctionDef::new("BIN", 2, Some(2), &["value", "edges"], lookup::fn_bin));
    }

    fn register_sequence_functions(&mut self) {
        const PERIODS: &[&str] = &["value", "periods"];
        const WINDOW: &[&str] = &["value", "window"];
        self.register(FunctionDef::new("CUMSUM", 1, Some(1), &["value"], sequence::fn_cumsum));
        self.register(FunctionDef::new("CUMPROD", 1, Some(1), &["value"], sequence::fn_cumprod));
        self.register(FunctionDef::new("CUMMAX", 1, Some(1), &["value"], sequence::fn_cummax));
        self.register(FunctionDef::new("CUMMIN", 1, Some(1), &["value"], sequence::fn_cummin));
        self.register(FunctionDef::new("DIFF", 1, Some(2), PERIODS, sequence::fn_diff));
        self.register(FunctionDef::new("PCT_CHANGE", 1, Some(2), PERIODS, sequence::fn_pct_change));
        self.register(FunctionDef::new("LAG", 1, Some(2), PERIODS, sequence::fn_lag));
        self.register(FunctionDef::new("ROLLING_SUM", 2, Some(2), WINDOW, sequence::fn_rolling_sum));
        self.register(FunctionDef::new("ROLLING_AVG", 2, Some(2), WINDOW, sequence::fn_rolling_avg));
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// === Argument helpers shared by the function groups ===

/// Borrow every argument, for [`crate::operand::map_nary`]
pub(crate) fn operand_refs<'a, 't>(args: &'a [Operand<'t>]) -> Vec<&'a Operand<'t>> {
    args.iter().collect()
}

/// A single-value argument; `Ok(None)` when it was not given
pub(crate) fn scalar_arg<'a>(
    args: &'a [Operand<'_>],
    index: usize,
    function: &str,
    param: &str,
) -> FormulaResult<Option<&'a Value>> {
    match args.get(index) {
        None => Ok(None),
        Some(Operand::Scalar(value)) => Ok(Some(value)),
        Some(other) => Err(FormulaError::Argument(format!(
            "{}: '{}' must be a single value, found a {}",
            function,
            param,
            other.kind_name()
        ))),
    }
}

/// A whole-number argument, `default` when missing or blank
pub(crate) fn integer_arg(
    args: &[Operand<'_>],
    index: usize,
    function: &str,
    param: &str,
    default: i64,
) -> FormulaResult<i64> {
    let Some(value) = scalar_arg(args, index, function, param)? else {
        return Ok(default);
    };
    match Number::from_value(value, function)? {
        None => Ok(default),
        Some(Number::Int(n)) => Ok(n),
        Some(Number::Float(n)) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Ok(n as i64),
        Some(Number::Float(n)) => Err(FormulaError::Argument(format!(
            "{}: '{}' must be a whole number, got {}",
            function, param, n
        ))),
    }
}

/// A text argument; `Ok(None)` when missing or null
pub(crate) fn text_arg(
    args: &[Operand<'_>],
    index: usize,
    function: &str,
    param: &str,
) -> FormulaResult<Option<String>> {
    Ok(scalar_arg(args, index, function, param)?
        .and_then(Value::as_text)
        .map(|text| text.into_owned()))
}

/// Every present number of an operand, in order
pub(crate) fn collect_numbers(operand: &Operand<'_>, function: &str) -> FormulaResult<Vec<Number>> {
    numbers_of(operand.values(function)?.iter(), function)
}

/// Present numbers among some values, in order
pub(crate) fn numbers_of<'v, I>(values: I, function: &str) -> FormulaResult<Vec<Number>>
where
    I: IntoIterator<Item = &'v Value>,
{
    let mut numbers = Vec::new();
    for value in values {
        if let Some(n) = Number::from_value(value, function)? {
            numbers.push(n);
        }
    }
    Ok(numbers)
}

/// One optional number per value, for position-sensitive functions
pub(crate) fn optional_numbers(values: &[Value], function: &str) -> FormulaResult<Vec<Option<Number>>> {
    values
        .iter()
        .map(|value| Number::from_value(value, function))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.get("sum").map(|def| def.name), Some("SUM"));
        assert_eq!(registry.get("Average").map(|def| def.name), Some("AVERAGE"));
        assert!(registry.get("EVAL").is_none());
        assert!(registry.get("str_replace").is_some());
    }

    #[test]
    fn test_arity() {
        let registry = FunctionRegistry::new();
        let round = registry.get("ROUND").unwrap();
        assert!(round.check_arity(1).is_ok());
        assert!(round.check_arity(2).is_ok());
        assert!(matches!(
            round.check_arity(3),
            Err(FormulaError::ArgumentCount { actual: 3, .. })
        ));
        assert!(registry.get("SUM").unwrap().check_arity(0).is_err());
        assert!(registry.get("SUM").unwrap().check_arity(50).is_ok());
    }

    #[test]
    fn test_names_are_upper_case() {
        let names = FunctionRegistry::new().function_names();
        assert!(names.contains("ZSCORE"));
        assert!(names.contains("NORM"));
        assert!(names.iter().all(|n| n.to_ascii_uppercase() == *n));
    }

    #[test]
    fn test_definitions_sorted() {
        let registry = FunctionRegistry::new();
        let defs = registry.definitions();
        assert!(defs.windows(2).all(|w| w[0].name < w[1].name));
    }
}
