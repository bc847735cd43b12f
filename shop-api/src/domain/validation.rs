//! 商品字段校验
//!
//! 每个函数只校验单个字段，成功时返回规范化后的值（去空白、转为整数），
//! 失败时返回 `AppError::Validation`，由 HTTP 层映射为 400。

use serde::Deserialize;

use crate::error::AppError;
use crate::utils::type_convert::lenient_string;

pub const SKU_MAX_LEN: usize = 50;
pub const CATEGORY_NAME_MIN_LEN: usize = 2;

/// 请求中携带的原始商品字段，multipart 与 JSON 共用
///
/// `None` 表示调用方没有提供该字段，和空字符串区分开。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stock: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub is_active: Option<String>,
}

impl ProductFields {
    /// multipart 文本字段按名称写入
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "price" => &mut self.price,
            "stock" => &mut self.stock,
            "sku" => &mut self.sku,
            "categoryId" => &mut self.category_id,
            "categoryName" => &mut self.category_name,
            "isActive" => &mut self.is_active,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// 部分更新时至少要有一个可更新字段
    pub fn has_any_field(&self) -> bool {
        self.name.is_some()
            || self.price.is_some()
            || self.stock.is_some()
            || self.sku.is_some()
            || self.category_id.is_some()
            || self.category_name.is_some()
            || self.is_active.is_some()
    }
}

pub fn validate_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Product name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

pub fn validate_price(raw: &str) -> Result<i64, AppError> {
    match parse_integer(raw) {
        Some(price) if price > 0 => Ok(price),
        _ => Err(AppError::Validation("Price must be a number greater than 0".to_string())),
    }
}

pub fn validate_stock(raw: &str) -> Result<i32, AppError> {
    match parse_integer(raw).map(i32::try_from) {
        Some(Ok(stock)) if stock >= 0 => Ok(stock),
        _ => Err(AppError::Validation("Stock must be a number greater than or equal to 0".to_string())),
    }
}

pub fn validate_category_id(raw: &str) -> Result<u64, AppError> {
    match parse_integer(raw) {
        Some(id) if id > 0 => Ok(id as u64),
        _ => Err(AppError::Validation("Category id must be a positive number".to_string())),
    }
}

pub fn validate_category_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.chars().count() < CATEGORY_NAME_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Category name must be at least {} characters",
            CATEGORY_NAME_MIN_LEN
        )));
    }
    Ok(name.to_string())
}

pub fn validate_is_active(raw: &str) -> Result<bool, AppError> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::Validation("isActive must be true or false".to_string())),
    }
}

pub fn validate_sku(raw: &str) -> Result<String, AppError> {
    let sku = raw.trim();
    if sku.is_empty() {
        return Err(AppError::Validation("SKU cannot be empty".to_string()));
    }
    if sku.chars().count() > SKU_MAX_LEN {
        return Err(AppError::Validation(format!(
            "SKU cannot be longer than {} characters",
            SKU_MAX_LEN
        )));
    }
    Ok(sku.to_string())
}

pub fn validate_quantity(raw: &str) -> Result<i32, AppError> {
    match parse_integer(raw).map(i32::try_from) {
        Some(Ok(quantity)) if quantity > 0 => Ok(quantity),
        _ => Err(AppError::Validation("Quantity must be a positive integer".to_string())),
    }
}

/// 路径、查询参数中的正整数 id
pub fn validate_id(raw: &str, field: &str) -> Result<u64, AppError> {
    match parse_integer(raw) {
        Some(id) if id > 0 => Ok(id as u64),
        _ => Err(AppError::Validation(format!("{} must be a positive number", field))),
    }
}

/// 取前导整数部分：`"12"`、`" 12.9"`、`"12abc"` 都得到 12，没有数字时返回 `None`
pub fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let value: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rejects_blank() {
        assert!(validate_name("   ").is_err());
        assert_eq!(validate_name("  Laptop ").unwrap(), "Laptop");
    }

    #[test]
    fn price_must_be_positive_integer() {
        assert_eq!(validate_price("1500").unwrap(), 1500);
        assert_eq!(validate_price("19.99").unwrap(), 19);
        assert!(validate_price("0").is_err());
        assert!(validate_price("-5").is_err());
        assert!(validate_price("abc").is_err());
        assert!(validate_price("").is_err());
    }

    #[test]
    fn stock_accepts_zero_but_not_negative() {
        assert_eq!(validate_stock("0").unwrap(), 0);
        assert_eq!(validate_stock("42").unwrap(), 42);
        assert!(validate_stock("-1").is_err());
        assert!(validate_stock("many").is_err());
        assert!(validate_stock("99999999999").is_err());
    }

    #[test]
    fn category_id_must_be_positive() {
        assert_eq!(validate_category_id("3").unwrap(), 3);
        assert!(validate_category_id("0").is_err());
        assert!(validate_category_id("x").is_err());
    }

    #[test]
    fn category_name_needs_two_characters_after_trim() {
        assert!(validate_category_name(" a ").is_err());
        assert_eq!(validate_category_name(" Tools ").unwrap(), "Tools");
    }

    #[test]
    fn is_active_only_accepts_literal_booleans() {
        assert!(validate_is_active("true").unwrap());
        assert!(!validate_is_active("false").unwrap());
        assert!(validate_is_active("yes").is_err());
        assert!(validate_is_active("1").is_err());
    }

    #[test]
    fn sku_is_trimmed_and_bounded() {
        assert_eq!(validate_sku("  AB-01 ").unwrap(), "AB-01");
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku(&"X".repeat(51)).is_err());
        assert!(validate_sku(&"X".repeat(50)).is_ok());
    }

    #[test]
    fn quantity_must_be_positive() {
        assert_eq!(validate_quantity("3").unwrap(), 3);
        assert!(validate_quantity("0").is_err());
        assert!(validate_quantity("-2").is_err());
    }

    #[test]
    fn empty_field_bag_has_nothing_to_update() {
        let mut fields = ProductFields::default();
        assert!(!fields.has_any_field());

        assert!(fields.set("stock", "3".to_string()));
        assert!(fields.has_any_field());
        assert!(!fields.set("color", "red".to_string()));
    }

    #[test]
    fn json_numbers_and_booleans_become_strings() {
        let fields: ProductFields =
            serde_json::from_str(r#"{"name":"Mouse","price":250,"stock":"4","isActive":false}"#).unwrap();

        assert_eq!(fields.price.as_deref(), Some("250"));
        assert_eq!(fields.stock.as_deref(), Some("4"));
        assert_eq!(fields.is_active.as_deref(), Some("false"));
        assert!(fields.sku.is_none());
    }
}
