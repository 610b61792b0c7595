use crate::derive_utils::apply_entity_derives;
use crate::field_utils::ensure_leading_field;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Item, ItemStruct, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

/// #[entity] 展开
/// - `id: String` 放在首位，缺失时补上
/// - 实现 `::entity_store::entity::Entity`（TYPE/BACKUP/id）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let string_ty: Type = syn::parse_quote! { String };
    ensure_leading_field(fields_named, "id", &string_ty);

    apply_entity_derives(&mut st.attrs, cfg.derive_debug.unwrap_or(true));

    let out_struct = ItemStruct { ..st };

    let ident = &out_struct.ident;
    let type_name = cfg
        .type_name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let backup = cfg.backup.unwrap_or(true);
    let generics = out_struct.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        #out_struct

        impl #impl_generics ::entity_store::entity::Entity for #ident #ty_generics #where_clause {
            const TYPE: &'static str = #type_name;
            const BACKUP: bool = #backup;

            fn id(&self) -> &str {
                ::core::convert::AsRef::<str>::as_ref(&self.id)
            }
        }
    };

    TokenStream::from(expanded)
}

// -------- 属性解析 --------

#[derive(Default)]
struct EntityAttrConfig {
    type_name: Option<LitStr>,
    backup: Option<bool>,
    derive_debug: Option<bool>,
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self::default();

        if input.is_empty() {
            return Ok(cfg);
        }

        let elems: Punctuated<EntityAttrElem, Token![,]> =
            Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                EntityAttrElem::TypeName(lit) => {
                    if cfg.type_name.is_some() {
                        return Err(syn::Error::new(
                            lit.span(),
                            "duplicate key 'type_name' in attribute",
                        ));
                    }
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(lit.span(), "'type_name' must not be empty"));
                    }
                    cfg.type_name = Some(lit);
                }
                EntityAttrElem::Backup(span, b) => {
                    if cfg.backup.is_some() {
                        return Err(syn::Error::new(span, "duplicate key 'backup' in attribute"));
                    }
                    cfg.backup = Some(b);
                }
                EntityAttrElem::Debug(span, b) => {
                    if cfg.derive_debug.is_some() {
                        return Err(syn::Error::new(span, "duplicate key 'debug' in attribute"));
                    }
                    cfg.derive_debug = Some(b);
                }
            }
        }

        Ok(cfg)
    }
}

enum EntityAttrElem {
    TypeName(LitStr),
    Backup(proc_macro2::Span, bool),
    Debug(proc_macro2::Span, bool),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        if key == "type_name" {
            let lit: LitStr = input.parse()?;
            Ok(EntityAttrElem::TypeName(lit))
        } else if key == "backup" {
            Ok(EntityAttrElem::Backup(key.span(), parse_bool(input, "backup")?))
        } else if key == "debug" {
            Ok(EntityAttrElem::Debug(key.span(), parse_bool(input, "debug")?))
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'type_name', 'backup' or 'debug'",
            ))
        }
    }
}

fn parse_bool(input: ParseStream, key: &str) -> Result<bool> {
    let expr: syn::Expr = input.parse()?;
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Bool(b),
            ..
        }) => Ok(b.value()),
        other => Err(syn::Error::new(
            other.span(),
            format!("expected boolean literal for '{key}'"),
        )),
    }
}
