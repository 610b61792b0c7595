use quote::ToTokens;
use syn::{Attribute, Path, Token, punctuated::Punctuated};

/// 实体必需的派生，按输出顺序排列
fn entity_derives(with_debug: bool) -> Vec<Path> {
    let mut paths: Vec<Path> = Vec::with_capacity(4);
    if with_debug {
        paths.push(syn::parse_quote!(Debug));
    }
    paths.push(syn::parse_quote!(Clone));
    paths.push(syn::parse_quote!(serde::Serialize));
    paths.push(syn::parse_quote!(serde::Deserialize));
    paths
}

// `Serialize` 与 `serde::Serialize` 视为同一派生
fn derive_key(p: &Path) -> String {
    match p.segments.last() {
        Some(last) if last.ident == "Serialize" || last.ident == "Deserialize" => {
            format!("serde::{}", last.ident)
        }
        Some(last) => last.ident.to_string(),
        None => p.to_token_stream().to_string(),
    }
}

/// 将结构体上已有的 `#[derive(...)]` 合并为一条：
/// 实体必需的派生在前，用户派生按原顺序在后，去重。
/// 其它属性（如 `#[serde(...)]`）原样保留在其后。
pub(crate) fn apply_entity_derives(attrs: &mut Vec<Attribute>, with_debug: bool) {
    let mut merged = entity_derives(with_debug);
    let mut seen: std::collections::HashSet<String> = merged.iter().map(derive_key).collect();
    let mut retained = Vec::with_capacity(attrs.len());

    for attr in attrs.drain(..) {
        if !attr.path().is_ident("derive") {
            retained.push(attr);
            continue;
        }
        let Ok(list) = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)
        else {
            retained.push(attr);
            continue;
        };
        merged.extend(list.into_iter().filter(|p| seen.insert(derive_key(p))));
    }

    attrs.push(syn::parse_quote!(#[derive(#(#merged),*)]));
    attrs.extend(retained);
}
