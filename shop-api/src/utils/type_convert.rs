//! 提供JSON字段类型转换功能
//!
//! 前端提交的表单既可能是 multipart（全部是字符串），也可能是 JSON（数字、布尔值），
//! 这里统一转成字符串，再交给字段校验函数解析。

use serde::{Deserialize, Deserializer};

/// 从字符串、数字或布尔值反序列化为 `Option<String>`
///
/// `null` 和字段缺失都得到 `None`；空字符串保留为 `Some("")`，由校验函数决定是否合法。
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        String(String),
        Integer(i64),
        Float(f64),
        Bool(bool),
    }

    let value = Option::<Lenient>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        Lenient::String(s) => s,
        Lenient::Integer(n) => n.to_string(),
        Lenient::Float(f) => f.to_string(),
        Lenient::Bool(b) => b.to_string(),
    }))
}

/// 查询参数里的数字可能为空字符串，统一视为未提供
pub fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
