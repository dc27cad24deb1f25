use std::fmt;

/// Filter operators.
///
/// Comparison operators require both sides to be totally ordered (number
/// vs number, string vs string); anything else evaluates to `false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    /// Left is an array containing the operand.
    ArrayContains,
    /// Left and operand are arrays sharing at least one element.
    ArrayContainsAny,
    /// Operand is an array containing left.
    In,
    /// Operand is an array not containing left.
    NotIn,
    /// Left and operand are arrays; every operand element is in left.
    ContainsAll,
    Exists,
    NotExists,
    IsNull,
    IsNotNull,
    StartsWith,
    EndsWith,
    StringContains,
    RegexMatch,
    IsEmpty,
    IsNotEmpty,
    /// Operand is `[lo, hi]`; inclusive on both ends.
    Between,
}

impl Operator {
    /// Operators that take no operand.
    pub const fn is_unary(&self) -> bool {
        matches!(
            self,
            Self::Exists
                | Self::NotExists
                | Self::IsNull
                | Self::IsNotNull
                | Self::IsEmpty
                | Self::IsNotEmpty
        )
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
            Self::LessThan => "lessThan",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::ArrayContains => "arrayContains",
            Self::ArrayContainsAny => "arrayContainsAny",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::ContainsAll => "containsAll",
            Self::Exists => "exists",
            Self::NotExists => "notExists",
            Self::IsNull => "isNull",
            Self::IsNotNull => "isNotNull",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::StringContains => "stringContains",
            Self::RegexMatch => "regexMatch",
            Self::IsEmpty => "isEmpty",
            Self::IsNotEmpty => "isNotEmpty",
            Self::Between => "between",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
