use proc_macro2::Span;
use syn::{Field, FieldsNamed, Ident, Token, Type, punctuated::Punctuated};

/// 让 `name` 成为结构体的第一个字段。
/// 已有同名字段时原样移到最前，否则插入新的 `name: ty` 字段。
pub(crate) fn ensure_leading_field(fields_named: &mut FieldsNamed, name: &str, ty: &Type) {
    let old_named = std::mem::take(&mut fields_named.named);
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    let (matching, rest): (Vec<Field>, Vec<Field>) = old_named
        .into_iter()
        .partition(|f| f.ident.as_ref().is_some_and(|i| i == name));

    match matching.into_iter().next() {
        Some(existing) => new_named.push(existing),
        None => {
            let ident = Ident::new(name, Span::call_site());
            new_named.push(syn::parse_quote! { pub #ident: #ty });
        }
    }
    new_named.extend(rest);

    fields_named.named = new_named;
}
