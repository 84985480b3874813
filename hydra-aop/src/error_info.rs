//! 错误信息结构
//!
//! 把 `anyhow::Error` 整理成结构化信息，供异常通知记录

/// 结构化的错误信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// 最外层错误消息
    pub message: String,

    /// 错误源链（cause chain），不含最外层
    pub source_chain: Vec<String>,
}

impl ErrorInfo {
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let mut chain = error.chain().map(ToString::to_string);
        let message = chain.next().unwrap_or_default();
        Self {
            message,
            source_chain: chain.collect(),
        }
    }

    /// 获取完整的错误描述（包含源链）
    pub fn full_description(&self) -> String {
        if self.source_chain.is_empty() {
            self.message.clone()
        } else {
            format!(
                "{}\nCaused by:\n  {}",
                self.message,
                self.source_chain.join("\n  ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_source_chain_is_collected() {
        let error = Err::<(), _>(std::io::Error::other("disk full"))
            .context("saving order")
            .unwrap_err();
        let info = ErrorInfo::from_anyhow(&error);

        assert_eq!(info.message, "saving order");
        assert_eq!(info.source_chain, vec!["disk full".to_string()]);
        assert_eq!(info.full_description(), "saving order\nCaused by:\n  disk full");
    }
}
