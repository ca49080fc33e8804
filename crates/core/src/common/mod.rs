use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod time;

/// # Summary
/// 指数所属交易所。
///
/// # Invariants
/// - 仅覆盖沪深两市，北交所指数不在监测范围内。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Exchange {
    // 上海证券交易所
    Sh,
    // 深圳证券交易所
    Sz,
}

impl Exchange {
    /// 交易所的小写前缀（`sh` / `sz`）
    pub fn prefix(&self) -> &'static str {
        match self {
            Exchange::Sh => "sh",
            Exchange::Sz => "sz",
        }
    }
}

/// # Summary
/// 指数标的实体，代表被监测的大盘指数，例如沪深300 `sh000300`。
///
/// # Invariants
/// - `code` 必须是 6 位数字。
/// - 字符串形式固定为 `交易所前缀 + 代码`，解析与显示互逆。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct IndexCode {
    // 交易所
    pub exchange: Exchange,
    // 6 位指数代码 (例如: 000300)
    pub code: String,
}

impl FromStr for IndexCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (exchange, code) = if let Some(rest) = lower.strip_prefix("sh") {
            (Exchange::Sh, rest)
        } else if let Some(rest) = lower.strip_prefix("sz") {
            (Exchange::Sz, rest)
        } else {
            return Err(format!("Unknown index exchange prefix: {}", s));
        };

        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Index code must be 6 digits: {}", s));
        }

        Ok(IndexCode {
            exchange,
            code: code.to_string(),
        })
    }
}

impl std::fmt::Display for IndexCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.exchange.prefix(), self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_code() {
        let code: IndexCode = "sh000300".parse().unwrap();
        assert_eq!(code.exchange, Exchange::Sh);
        assert_eq!(code.code, "000300");
        assert_eq!(code.to_string(), "sh000300");

        let code: IndexCode = "SZ399006".parse().unwrap();
        assert_eq!(code.exchange, Exchange::Sz);
        assert_eq!(code.to_string(), "sz399006");
    }

    #[test]
    fn test_reject_malformed_index_code() {
        assert!("000300".parse::<IndexCode>().is_err());
        assert!("sh00030".parse::<IndexCode>().is_err());
        assert!("shabcdef".parse::<IndexCode>().is_err());
        assert!("bj899050".parse::<IndexCode>().is_err());
    }
}
