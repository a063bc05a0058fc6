//! AST allow-list validation
//!
//! Every node of a parsed formula is checked before anything is evaluated.
//! Only arithmetic, calls to registered functions by bare name, known names
//! and literal collections pass; everything else is a security error.

use ahash::AHashSet;

use crate::ast::{BinaryOperator, Constant, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};

/// Binary operators a formula may use
pub const ALLOWED_BINARY_OPERATORS: &[BinaryOperator] = &[
    BinaryOperator::Add,
    BinaryOperator::Subtract,
    BinaryOperator::Multiply,
    BinaryOperator::Divide,
    BinaryOperator::Power,
    BinaryOperator::Modulo,
];

/// Unary operators a formula may use
pub const ALLOWED_UNARY_OPERATORS: &[UnaryOperator] = &[UnaryOperator::Plus, UnaryOperator::Negate];

/// Check an AST against the allow-lists
///
/// `allowed_names` holds the identifiers a bare name may refer to (safe column
/// identifiers and named constants). `allowed_functions` holds upper-case
/// function names; calls match them case-insensitively.
pub fn validate(
    expr: &FormulaExpr,
    allowed_names: &AHashSet<String>,
    allowed_functions: &AHashSet<String>,
) -> FormulaResult<()> {
    Validator {
        names: allowed_names,
        functions: allowed_functions,
    }
    .check(expr)
}

struct Validator<'a> {
    names: &'a AHashSet<String>,
    functions: &'a AHashSet<String>,
}

impl Validator<'_> {
    fn check(&self, expr: &FormulaExpr) -> FormulaResult<()> {
        match expr {
            FormulaExpr::Constant(_) => Ok(()),

            FormulaExpr::Name(name) => {
                if self.names.contains(name) {
                    Ok(())
                } else if self.is_function(name) {
                    Err(FormulaError::DisallowedConstruct(format!(
                        "function '{}' used as a value",
                        name
                    )))
                } else {
                    Err(FormulaError::UnknownName(name.clone()))
                }
            }

            FormulaExpr::BinaryOp { op, left, right } => {
                if !ALLOWED_BINARY_OPERATORS.contains(op) {
                    return Err(FormulaError::DisallowedOperator(op.symbol().to_string()));
                }
                self.check(left)?;
                self.check(right)
            }

            FormulaExpr::UnaryOp { op, operand } => {
                if !ALLOWED_UNARY_OPERATORS.contains(op) {
                    return Err(FormulaError::DisallowedOperator(op.symbol().to_string()));
                }
                self.check(operand)
            }

            FormulaExpr::Call {
                func,
                args,
                keywords,
            } => {
                match func.as_ref() {
                    FormulaExpr::Name(name) if self.is_function(name) => {}
                    FormulaExpr::Name(name) => {
                        return Err(FormulaError::UnknownFunction(name.clone()))
                    }
                    other => {
                        return Err(FormulaError::InvalidCallTarget(other.kind_name().to_string()))
                    }
                }
                for arg in args {
                    self.check(arg)?;
                }
                for keyword in keywords {
                    self.check(&keyword.value)?;
                }
                Ok(())
            }

            FormulaExpr::Sequence(items) => items.iter().try_for_each(|item| self.check(item)),

            FormulaExpr::Mapping(entries) => entries.iter().try_for_each(|(key, value)| {
                require_literal(key)?;
                require_literal(value)
            }),

            FormulaExpr::Attribute { .. }
            | FormulaExpr::Subscript { .. }
            | FormulaExpr::Lambda { .. }
            | FormulaExpr::Comprehension { .. } => {
                Err(FormulaError::DisallowedConstruct(expr.kind_name().to_string()))
            }
        }
    }

    fn is_function(&self, name: &str) -> bool {
        self.functions.contains(&name.to_ascii_uppercase())
    }
}

/// Mapping keys and values must be plain literals (a signed number counts)
fn require_literal(expr: &FormulaExpr) -> FormulaResult<()> {
    match expr {
        FormulaExpr::Constant(_) => Ok(()),
        FormulaExpr::UnaryOp {
            op: UnaryOperator::Negate | UnaryOperator::Plus,
            operand,
        } if matches!(
            operand.as_ref(),
            FormulaExpr::Constant(Constant::Int(_) | Constant::Float(_))
        ) =>
        {
            Ok(())
        }
        other => Err(FormulaError::DisallowedConstruct(format!(
            "{} inside a mapping literal",
            other.kind_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn check(formula: &str) -> FormulaResult<()> {
        let names: AHashSet<String> = ["Sales", "Cost", "PI"].iter().map(|s| s.to_string()).collect();
        let functions: AHashSet<String> = ["SUM", "ROUND", "MAP"].iter().map(|s| s.to_string()).collect();
        validate(&parse_formula(formula).unwrap(), &names, &functions)
    }

    #[test]
    fn test_allows_arithmetic_and_calls() {
        assert!(check("Sales - Cost * 2 ** -1 % 3 / +PI").is_ok());
        assert!(check("round(SUM(Sales, Cost), digits=2)").is_ok());
        assert!(check("MAP(Sales, {'a': 1, 2: -3.5, 'c': 'd'})").is_ok());
        assert!(check("SUM([1, Sales])").is_ok());
    }

    #[test]
    fn test_rejects_unknown_names() {
        assert!(matches!(check("Sales + Tax"), Err(FormulaError::UnknownName(n)) if n == "Tax"));
        assert!(matches!(check("EVAL(Sales)"), Err(FormulaError::UnknownFunction(n)) if n == "EVAL"));
        assert!(matches!(check("SUM + 1"), Err(FormulaError::DisallowedConstruct(_))));
    }

    #[test]
    fn test_rejects_operators() {
        for formula in ["Sales // 2", "Sales == 1", "Sales < Cost", "Sales & 1", "Sales | 1", "~Sales", "not Sales"] {
            let err = check(formula).unwrap_err();
            assert!(err.is_security(), "{formula}: {err}");
            assert!(matches!(err, FormulaError::DisallowedOperator(_)), "{formula}");
        }
    }

    #[test]
    fn test_rejects_constructs() {
        assert!(matches!(check("os.system('ls')"), Err(FormulaError::InvalidCallTarget(_))));
        assert!(matches!(check("Sales.real"), Err(FormulaError::DisallowedConstruct(_))));
        assert!(matches!(check("Sales[0]"), Err(FormulaError::DisallowedConstruct(_))));
        assert!(matches!(check("lambda x: x"), Err(FormulaError::DisallowedConstruct(_))));
        assert!(matches!(check("[v for v in Sales]"), Err(FormulaError::DisallowedConstruct(_))));
        assert!(matches!(check("SUM(Sales)(1)"), Err(FormulaError::InvalidCallTarget(_))));
    }

    #[test]
    fn test_mapping_requires_literals() {
        assert!(check("MAP(Sales, {'a': Sales})").unwrap_err().is_security());
        assert!(check("MAP(Sales, {'a': 1 + 1})").unwrap_err().is_security());
        assert!(check("MAP(Sales, {-'a': 1})").unwrap_err().is_security());
    }

    #[test]
    fn test_rejections_inside_arguments() {
        assert!(check("SUM(Sales, __import__('os'))").unwrap_err().is_security());
        assert!(check("ROUND(Sales, digits=Sales.imag)").unwrap_err().is_security());
    }
}
