//! 受限的比较表达式求值器
//!
//! 用于字段校验（`#[expr("$>=3")]`）和属性值条件。语法刻意保持很窄：
//!
//! ```text
//! expr       := comparison (("&&" | "||") comparison)*
//! comparison := operand (op operand)?
//! op         := "==" | "!=" | "<" | "<=" | ">" | ">="
//! operand    := "$" | number | "quoted string" | 'quoted string' | word
//! ```
//!
//! `$` 代表被校验的值。逻辑运算符按从左到右顺序依次求值，不区分优先级，
//! 即 `a || b && c` 等价于 `(a || b) && c`。
//! 两边都能解析为数字时按数值比较，否则按字符串比较。

use crate::errors::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Value,
    Number(f64),
    Text(String),
    Op(CmpOp),
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn invalid(expr: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidExpression {
        expr: expr.to_string(),
        reason: reason.into(),
    }
}

fn tokenize(expr: &str) -> ConfigResult<Vec<Token>> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '$' => {
                tokens.push(Token::Value);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Eq));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Op(CmpOp::Ne));
                i += 2;
            }
            '<' | '>' => {
                let eq = next == Some('=');
                let op = match (c, eq) {
                    ('<', true) => CmpOp::Le,
                    ('<', false) => CmpOp::Lt,
                    (_, true) => CmpOp::Ge,
                    _ => CmpOp::Gt,
                };
                tokens.push(Token::Op(op));
                i += if eq { 2 } else { 1 };
            }
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| invalid(expr, "unterminated string"))?;
                tokens.push(Token::Text(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| invalid(expr, format!("bad number {text}")))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | '-'))
                {
                    i += 1;
                }
                tokens.push(Token::Text(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(expr, format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

/// 操作数的运行时值
#[derive(Debug, Clone)]
enum Operand {
    Number(f64),
    Text(String),
}

impl Operand {
    fn from_text(s: &str) -> Self {
        s.trim()
            .parse::<f64>()
            .map_or_else(|_| Self::Text(s.to_string()), Self::Number)
    }

    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

fn compare(left: &Operand, op: CmpOp, right: &Operand) -> bool {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Operand::Number(a), Operand::Number(b)) => a.partial_cmp(b),
        _ => Some(left.as_text().cmp(&right.as_text())),
    };
    match ordering {
        None => op == CmpOp::Ne,
        Some(ord) => match op {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        },
    }
}

/// 以 `value` 代替 `$` 求值表达式
pub fn evaluate(expr: &str, value: &str) -> ConfigResult<bool> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(invalid(expr, "empty expression"));
    }

    let operand = |token: &Token| -> ConfigResult<Operand> {
        match token {
            Token::Value => Ok(Operand::from_text(value)),
            Token::Number(n) => Ok(Operand::Number(*n)),
            Token::Text(s) => Ok(Operand::Text(s.clone())),
            other => Err(invalid(expr, format!("expect operand, found {other:?}"))),
        }
    };

    let mut result: Option<bool> = None;
    let mut pending: Option<&Token> = None;
    let mut i = 0;

    while i < tokens.len() {
        let left = operand(&tokens[i])?;
        let matched = match tokens.get(i + 1) {
            Some(Token::Op(op)) => {
                let right = tokens
                    .get(i + 2)
                    .ok_or_else(|| invalid(expr, "missing right operand"))
                    .and_then(|t| operand(t))?;
                i += 3;
                compare(&left, *op, &right)
            }
            _ => {
                i += 1;
                match left.as_text().as_str() {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    other => return Err(invalid(expr, format!("{other} is not a bool"))),
                }
            }
        };

        result = Some(match (result, pending) {
            (None, _) => matched,
            (Some(acc), Some(Token::And)) => acc && matched,
            (Some(acc), _) => acc || matched,
        });

        match tokens.get(i) {
            None => break,
            Some(t @ (Token::And | Token::Or)) => {
                pending = Some(t);
                i += 1;
                if i >= tokens.len() {
                    return Err(invalid(expr, "dangling logical operator"));
                }
            }
            Some(other) => return Err(invalid(expr, format!("unexpected token {other:?}"))),
        }
    }

    result.ok_or_else(|| invalid(expr, "empty expression"))
}

/// 校验值，不满足时返回 [`ConfigError::ValidationFailed`]
pub fn validate(expr: &str, value: &str) -> ConfigResult<()> {
    if evaluate(expr, value)? {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed {
            expr: expr.to_string(),
            value: value.to_string(),
        })
    }
}
