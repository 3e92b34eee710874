use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr};

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let vis = &input.vis;
    let draft_name = format_ident!("{}Draft", name);
    let patch_name = format_ident!("{}Patch", name);

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record derive does not support generic records",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record derive only supports structs",
            ))
        }
    };

    let slot = extract_slot(input)?;
    let id_field = extract_id_field(name, fields.iter())?;
    let container_serde = container_serde_attrs(&input.attrs)?;

    let mut draft_fields = Vec::new();
    let mut patch_fields = Vec::new();
    let mut from_draft = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if *ident == id_field {
            continue;
        }

        let ty = &field.ty;
        let field_vis = &field.vis;
        let serde_attrs = field_serde_attrs(&field.attrs)?;

        if has_record_flag(field, "default")? {
            draft_fields.push(quote! {
                #(#serde_attrs)*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                #field_vis #ident: ::std::option::Option<#ty>
            });
            from_draft.push(quote! { #ident: draft.#ident.unwrap_or_default() });
        } else {
            draft_fields.push(quote! {
                #(#serde_attrs)*
                #field_vis #ident: #ty
            });
            from_draft.push(quote! { #ident: draft.#ident });
        }

        patch_fields.push(quote! {
            #(#serde_attrs)*
            #[serde(default, skip_serializing_if = "Option::is_none")]
            #field_vis #ident: ::std::option::Option<#ty>
        });
    }

    let draft_doc = format!("Fields of a new [`{}`] before an id is assigned.", name);
    let patch_doc = format!(
        "Partial update for [`{}`]. Only fields set to `Some` are merged.",
        name
    );

    Ok(quote! {
        #[doc = #draft_doc]
        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
        #(#container_serde)*
        #vis struct #draft_name {
            #(#draft_fields,)*
        }

        #[doc = #patch_doc]
        #[derive(Debug, Clone, Default, ::serde::Serialize, ::serde::Deserialize)]
        #(#container_serde)*
        #vis struct #patch_name {
            #(#patch_fields,)*
        }

        impl ::fitdash::Record for #name {
            const SLOT: &'static str = #slot;
            type Draft = #draft_name;
            type Patch = #patch_name;

            fn id(&self) -> &::fitdash::RecordId {
                &self.#id_field
            }

            fn from_draft(id: ::fitdash::RecordId, draft: Self::Draft) -> Self {
                Self {
                    #id_field: id,
                    #(#from_draft,)*
                }
            }
        }
    })
}

fn extract_slot(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        let mut slot = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("slot") {
                let value: LitStr = meta.value()?.parse()?;
                slot = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute, expected `slot = \"...\"`"))
            }
        })?;

        if let Some(s) = slot {
            return Ok(s);
        }
    }

    // Default: snake_case struct name + "s"
    Ok(format!("{}s", to_snake_case(&input.ident.to_string())))
}

fn extract_id_field<'a>(
    name: &syn::Ident,
    fields: impl Iterator<Item = &'a Field> + Clone,
) -> syn::Result<syn::Ident> {
    for field in fields.clone() {
        if has_record_flag(field, "id")? {
            if let Some(ident) = &field.ident {
                return Ok(ident.clone());
            }
        }
    }

    for field in fields {
        if let Some(ident) = &field.ident {
            if ident == "id" {
                return Ok(ident.clone());
            }
        }
    }

    Err(syn::Error::new_spanned(
        name,
        "Record derive: no field marked with #[record(id)] and no field named `id`",
    ))
}

fn has_record_flag(field: &Field, flag: &str) -> syn::Result<bool> {
    let mut found = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") || meta.path.is_ident("default") {
                if meta.path.is_ident(flag) {
                    found = true;
                }
                Ok(())
            } else {
                Err(meta.error("unsupported record field attribute, expected `id` or `default`"))
            }
        })?;
    }
    Ok(found)
}

/// Carries `rename_all` over to the companion types so they share the record's wire names.
fn container_serde_attrs(attrs: &[Attribute]) -> syn::Result<Vec<TokenStream2>> {
    let mut out = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                out.push(quote! { #[serde(rename_all = #value)] });
                Ok(())
            } else {
                skip_meta_value(&meta)
            }
        })?;
    }
    Ok(out)
}

/// Keeps `rename` and `alias`; anything else is tied to the original field type.
fn field_serde_attrs(attrs: &[Attribute]) -> syn::Result<Vec<TokenStream2>> {
    let mut out = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let keyed = meta.input.peek(syn::Token![=]);
            if keyed && meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                out.push(quote! { #[serde(rename = #value)] });
                Ok(())
            } else if keyed && meta.path.is_ident("alias") {
                let value: LitStr = meta.value()?.parse()?;
                out.push(quote! { #[serde(alias = #value)] });
                Ok(())
            } else {
                skip_meta_value(&meta)
            }
        })?;
    }
    Ok(out)
}

fn skip_meta_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream2 = content.parse()?;
    }
    Ok(())
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
