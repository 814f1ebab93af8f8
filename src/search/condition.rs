use crate::search::FilterError;

/// Comparison operator accepted in a filter condition.
///
/// The allow-list is closed: anything the parser emits maps to one of
/// these five, so operator text never reaches SQL from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }

    /// Swap the direction of the comparison. Used for the last-viewed
    /// filter: "watched more than a year ago" means the stored latest
    /// date is *older* (smaller) than today minus a year, so the
    /// user's `>` becomes `<` on the column. Involutive.
    pub fn invert(self) -> Op {
        match self {
            Op::Eq => Op::Eq,
            Op::Lt => Op::Gt,
            Op::Le => Op::Ge,
            Op::Gt => Op::Lt,
            Op::Ge => Op::Le,
        }
    }
}

/// Split a raw condition like `"< 120"` or `">= 1 year"` into an
/// operator and the trimmed remainder.
///
/// Leading characters from `{=, <, >}` accumulate as the operator
/// token; the first other character ends it. An unrecognized token
/// (including an empty one) fails the whole condition.
pub fn parse_condition(raw: &str) -> Result<(Op, &str), FilterError> {
    let trimmed = raw.trim_start();
    let split = trimmed
        .find(|c| !matches!(c, '=' | '<' | '>'))
        .unwrap_or(trimmed.len());
    let (token, rest) = trimmed.split_at(split);

    let op = match token {
        "=" => Op::Eq,
        "<" => Op::Lt,
        "<=" => Op::Le,
        ">" => Op::Gt,
        ">=" => Op::Ge,
        _ => return Err(FilterError::BadOperator(token.to_string())),
    };

    Ok((op, rest.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_valid_operators() {
        let cases = [
            ("= 120", Op::Eq),
            ("< 120", Op::Lt),
            ("<= 120", Op::Le),
            ("> 120", Op::Gt),
            (">= 120", Op::Ge),
        ];
        for (raw, op) in cases {
            let (parsed, value) = parse_condition(raw).unwrap();
            assert_eq!(parsed, op, "operator in {raw:?}");
            assert_eq!(value, "120", "value in {raw:?}");
        }
    }

    #[test]
    fn test_value_is_trimmed() {
        let (_, value) = parse_condition("<    1 year  ").unwrap();
        assert_eq!(value, "1 year");
    }

    #[test]
    fn test_operator_without_space() {
        let (op, value) = parse_condition(">=90").unwrap();
        assert_eq!(op, Op::Ge);
        assert_eq!(value, "90");
    }

    #[test]
    fn test_invalid_operators_fail() {
        for raw in ["~120", "=< 120", "<> 120", "== 120", "120", ""] {
            assert!(parse_condition(raw).is_err(), "should fail: {raw:?}");
        }
    }

    #[test]
    fn test_invert_is_involutive() {
        for op in [Op::Eq, Op::Lt, Op::Le, Op::Gt, Op::Ge] {
            assert_eq!(op.invert().invert(), op);
        }
        assert_eq!(Op::Eq.invert(), Op::Eq);
        assert_eq!(Op::Lt.invert(), Op::Gt);
        assert_eq!(Op::Le.invert(), Op::Ge);
    }
}
