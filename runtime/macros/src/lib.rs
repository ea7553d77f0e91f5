//! `#[derive(Bind)]` for routeforge record handlers.
//!
//! Each field carrying a `#[param(...)]` attribute is read from the request; every other field
//! (and every `#[param(skip)]` field) starts from its `Default`. The expansion only calls
//! into `routeforge_runtime`, so all parsing and validation lives in the runtime crate.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitInt, LitStr, Path, Type};

/// Derive `Bind` for a struct with named fields.
///
/// ```ignore
/// use routeforge_runtime::{Bind, UploadedFile};
///
/// #[derive(Debug, Default, Bind)]
/// pub struct Signup {
///     #[param(in = "form", required, len = "1:10", desc = "user name")]
///     pub name: String,
///     #[param(in = "query", name = "ref")]
///     pub referrer: Option<String>,
///     #[param(in = "form", maxmb = 2)]
///     pub avatar: Option<UploadedFile>,
///     #[param(skip)]
///     pub avatar_url: String,
/// }
/// ```
///
/// `in` is one of `path`, `query`, `form`, `body`, `header` or `cookie`. The request key
/// defaults to the field name. `#[bind(crate = "path")]` on the struct points the expansion at
/// a re-exported runtime.
#[proc_macro_derive(Bind, attributes(param, bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct ParamAttr {
    source: Option<LitStr>,
    name: Option<String>,
    required: bool,
    nonzero: bool,
    len: Option<String>,
    range: Option<String>,
    regex: Option<String>,
    maxmb: Option<u32>,
    err: Option<String>,
    skip: bool,
}

fn parse_param(attrs: &[Attribute]) -> syn::Result<Option<ParamAttr>> {
    let mut found: Option<ParamAttr> = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("param")) {
        let param = found.get_or_insert_with(ParamAttr::default);
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("in") {
                param.source = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("name") {
                param.name = Some(string(&meta)?);
            } else if meta.path.is_ident("required") {
                param.required = true;
            } else if meta.path.is_ident("nonzero") {
                param.nonzero = true;
            } else if meta.path.is_ident("len") {
                param.len = Some(string(&meta)?);
            } else if meta.path.is_ident("range") {
                param.range = Some(string(&meta)?);
            } else if meta.path.is_ident("regex") {
                param.regex = Some(string(&meta)?);
            } else if meta.path.is_ident("maxmb") {
                param.maxmb = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if meta.path.is_ident("err") {
                param.err = Some(string(&meta)?);
            } else if meta.path.is_ident("desc") {
                string(&meta)?;
            } else if meta.path.is_ident("skip") {
                param.skip = true;
            } else {
                return Err(meta.error("unsupported param attribute"));
            }
            Ok(())
        })?;
    }
    Ok(found)
}

fn string(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    Ok(meta.value()?.parse::<LitStr>()?.value())
}

fn runtime_path(attrs: &[Attribute]) -> syn::Result<Path> {
    let mut path: Path = syn::parse_quote!(::routeforge_runtime);
    for attr in attrs.iter().filter(|a| a.path().is_ident("bind")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                path = meta.value()?.parse::<LitStr>()?.parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported bind attribute"))
            }
        })?;
    }
    Ok(path)
}

fn opt_str(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(v) => quote!(::core::option::Option::Some(#v)),
        None => quote!(::core::option::Option::None),
    }
}

fn rules(krate: &Path, param: &ParamAttr) -> TokenStream2 {
    let required = param.required;
    let nonzero = param.nonzero;
    let len = opt_str(&param.len);
    let range = opt_str(&param.range);
    let regex = opt_str(&param.regex);
    let err = opt_str(&param.err);
    let maxmb = match param.maxmb {
        Some(mb) => quote!(::core::option::Option::Some(#mb)),
        None => quote!(::core::option::Option::None),
    };
    quote! {
        #krate::__private::Rules {
            required: #required,
            nonzero: #nonzero,
            len: #len,
            range: #range,
            regex: #regex,
            maxmb: #maxmb,
            err: #err,
        }
    }
}

fn is_upload(ty: &Type) -> bool {
    ty.to_token_stream().to_string().contains("UploadedFile")
}

fn field_value(krate: &Path, ty: &Type, key: &str, param: &ParamAttr) -> syn::Result<TokenStream2> {
    let Some(source) = &param.source else {
        return Err(syn::Error::new_spanned(
            ty,
            "param attribute needs `in = \"...\"` or `skip`",
        ));
    };
    let rules = rules(krate, param);
    let position = match source.value().as_str() {
        "body" => {
            return Ok(quote!(#krate::__private::bind_body::<#ty>(ctx, #key, &#rules)?));
        }
        "form" if is_upload(ty) => {
            return Ok(quote!(#krate::__private::bind_upload::<#ty>(ctx, #key, &#rules)?));
        }
        "path" => quote!(Path),
        "query" => quote!(Query),
        "form" => quote!(Form),
        "header" => quote!(Header),
        "cookie" => quote!(Cookie),
        _ => {
            return Err(syn::Error::new_spanned(
                source,
                "expected one of path, query, form, body, header or cookie",
            ))
        }
    };
    Ok(quote! {
        #krate::__private::bind_param::<#ty>(ctx, #krate::Source::#position, #key, &#rules)?
    })
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let krate = runtime_path(&input.attrs)?;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bind can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bind needs a struct with named fields",
        ));
    };

    let mut inits = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let Some(ident) = &field.ident else {
            continue;
        };
        let value = match parse_param(&field.attrs)? {
            Some(param) if !param.skip => {
                let key = param
                    .name
                    .clone()
                    .unwrap_or_else(|| ident.unraw().to_string());
                field_value(&krate, &field.ty, &key, &param)?
            }
            _ => quote!(::core::default::Default::default()),
        };
        inits.push(quote!(#ident: #value));
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics #krate::Bind for #name #ty_generics #where_clause {
            fn bind(ctx: &#krate::Context) -> ::core::result::Result<Self, #krate::BindError> {
                ::core::result::Result::Ok(Self {
                    #(#inits,)*
                })
            }
        }
    })
}
