use proc_macro::TokenStream;

mod derive_utils;
mod entity;
mod field_utils;

/// 实体宏
/// - 将 `id: String` 字段放在首位（已有 `id` 字段则复用）
/// - 派生 `Debug`、`Clone`、`serde::Serialize`、`serde::Deserialize`
/// - 实现 `::entity_store::entity::Entity`
/// - 参数：`#[entity(type_name = "...", backup = true|false, debug = true|false)]`
///   - `type_name` 默认为结构体名
///   - `backup` 默认为 `true`
///   - `debug = false` 时不派生 `Debug`，便于手写实现
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}
