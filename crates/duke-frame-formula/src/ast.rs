//! Formula Abstract Syntax Tree types

use std::fmt;

/// Formula expression AST
///
/// The parser accepts a slightly wider grammar than the evaluator supports:
/// attribute access, subscripts, lambdas and comprehensions are parsed into
/// their own nodes so the validator can reject them by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Number, string or boolean literal
    Constant(Constant),

    // === References ===
    /// Column identifier, named constant or function name
    Name(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Call {
        func: Box<FormulaExpr>,
        args: Vec<FormulaExpr>,
        keywords: Vec<Keyword>,
    },

    // === Literal collections ===
    /// List literal `[a, b, c]`
    Sequence(Vec<FormulaExpr>),
    /// Object literal `{key: value, ...}`
    Mapping(Vec<(FormulaExpr, FormulaExpr)>),

    // === Rejected by the validator ===
    /// `value.attr`
    Attribute {
        value: Box<FormulaExpr>,
        attr: String,
    },
    /// `value[index]`
    Subscript {
        value: Box<FormulaExpr>,
        index: Box<FormulaExpr>,
    },
    /// `lambda params: body`
    Lambda {
        params: Vec<String>,
        body: Box<FormulaExpr>,
    },
    /// `[element for target in iter]`
    Comprehension {
        element: Box<FormulaExpr>,
        target: Box<FormulaExpr>,
        iter: Box<FormulaExpr>,
    },
}

impl FormulaExpr {
    /// Short node name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            FormulaExpr::Constant(_) => "constant",
            FormulaExpr::Name(_) => "name",
            FormulaExpr::BinaryOp { .. } => "binary operation",
            FormulaExpr::UnaryOp { .. } => "unary operation",
            FormulaExpr::Call { .. } => "call",
            FormulaExpr::Sequence(_) => "list",
            FormulaExpr::Mapping(_) => "mapping",
            FormulaExpr::Attribute { .. } => "attribute access",
            FormulaExpr::Subscript { .. } => "subscript",
            FormulaExpr::Lambda { .. } => "lambda",
            FormulaExpr::Comprehension { .. } => "comprehension",
        }
    }

    /// Build an integer literal
    pub fn int(n: i64) -> Self {
        FormulaExpr::Constant(Constant::Int(n))
    }

    /// Build a float literal
    pub fn float(n: f64) -> Self {
        FormulaExpr::Constant(Constant::Float(n))
    }

    /// Build a string literal
    pub fn string<S: Into<String>>(s: S) -> Self {
        FormulaExpr::Constant(Constant::String(s.into()))
    }

    /// Build a name reference
    pub fn name<S: Into<String>>(s: S) -> Self {
        FormulaExpr::Name(s.into())
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

/// Keyword argument `name=value` in a call
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: String,
    pub value: FormulaExpr,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
    FloorDivide,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOperator {
    /// Operator as written in a formula
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "**",
            BinaryOperator::Modulo => "%",
            BinaryOperator::FloorDivide => "//",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Negate,
    Invert,
    Not,
}

impl UnaryOperator {
    /// Operator as written in a formula
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Negate => "-",
            UnaryOperator::Invert => "~",
            UnaryOperator::Not => "not",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
