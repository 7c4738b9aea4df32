//! Procedural macros for hostcall tool definitions.
//!
//! `#[tool]` turns a free function into a registered tool candidate, while
//! `#[derive(Describe)]` and `#[derive(ToolInput)]` describe the shapes of
//! parameter and result types. The generated code refers to items through
//! `::hostcall_tools`, so the crate using these macros must depend on it.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Fields, FnArg, GenericArgument, Ident, ItemFn,
    Lit, LitStr, Pat, PathArguments, ReturnType, Token, Type, TypeParamBound, parse_macro_input,
    parse_quote,
};

/// Registers a free function as a tool.
///
/// ```ignore
/// #[tool(name = "move_node", description = "Moves a node", method = "POST",
///        tags("scene"), body = "position")]
/// pub fn move_node(node: String, position: Vec3, #[arg(default = 1.0)] speed: f64) -> Result<Vec3, SceneError> {
///     ..
/// }
/// ```
///
/// The calling convention follows the declared return type: `()` or
/// `Result<(), E>` is fire-and-forget, `async fn` and future types wait for
/// their output unless it is unit, anything else is synchronous. When no
/// description is given the function's doc comment is used.
///
/// `#[arg(default = expr)]` declares the value used when a caller omits the
/// parameter; the expression must have the parameter's type, except that a
/// string literal is converted with `From`.
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = ToolArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(&meta));
    parse_macro_input!(attr with parser);
    let func = parse_macro_input!(item as ItemFn);

    expand_tool(args, func)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `hostcall_tools::Describe` for a struct with named fields or an
/// enum with unit variants.
///
/// `#[serde(rename)]`, `#[serde(rename_all)]`, `#[serde(skip)]` and
/// `#[serde(default)]` are honoured so the schema matches the wire format.
#[proc_macro_derive(Describe, attributes(serde))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_describe(&input, false)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Marks a struct as a single structured tool input.
///
/// A tool whose only parameter is such a struct binds each field from the
/// request by name, starting from `Default::default()`. The struct must also
/// implement `Default`, `Serialize` and `Deserialize`.
#[proc_macro_derive(ToolInput, attributes(serde))]
pub fn derive_tool_input(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_describe(&input, true)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct ToolArgs {
    name: Option<LitStr>,
    description: Option<LitStr>,
    method: Option<LitStr>,
    tags: Vec<LitStr>,
    body: Option<LitStr>,
}

impl ToolArgs {
    fn parse(&mut self, meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("description") {
            self.description = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("method") {
            self.method = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("body") {
            self.body = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("tags") {
            let content;
            syn::parenthesized!(content in meta.input);
            let tags = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
            self.tags.extend(tags);
        } else {
            return Err(meta.error("expected `name`, `description`, `method`, `tags` or `body`"));
        }
        Ok(())
    }
}

/// Parameter of a `#[tool]` function after its attributes were stripped.
struct ToolParam {
    name: String,
    ty: Type,
    default: Option<Expr>,
}

/// How a declared output maps onto the erased invocation.
enum Output {
    Unit,
    UnitResult,
    Value(Type),
    ValueResult(Type),
}

impl Output {
    fn value_type(&self) -> Option<&Type> {
        match self {
            Self::Value(ty) | Self::ValueResult(ty) => Some(ty),
            Self::Unit | Self::UnitResult => None,
        }
    }

    fn adapter(&self, is_future: bool) -> Ident {
        let name = match (is_future, self) {
            (false, Self::Unit) => "done",
            (false, Self::UnitResult) => "done_result",
            (false, Self::Value(_)) => "complete",
            (false, Self::ValueResult(_)) => "complete_result",
            (true, Self::Unit) => "detached",
            (true, Self::UnitResult) => "detached_result",
            (true, Self::Value(_)) => "pending",
            (true, Self::ValueResult(_)) => "pending_result",
        };
        Ident::new(name, Span::call_site())
    }
}

fn expand_tool(args: ToolArgs, mut func: ItemFn) -> syn::Result<TokenStream2> {
    if let Some(receiver) = func.sig.receiver() {
        return Err(syn::Error::new_spanned(
            receiver,
            "#[tool] functions cannot take `self`; tools must be callable without an instance",
        ));
    }
    if let Some(param) = func.sig.generics.type_params().next() {
        return Err(syn::Error::new_spanned(
            param,
            "#[tool] functions cannot be generic over types",
        ));
    }

    let params = take_params(&mut func)?;
    let (is_future, output) = classify_return(&func);

    let fn_ident = &func.sig.ident;
    let tool_name = args
        .name
        .unwrap_or_else(|| LitStr::new(&unraw(fn_ident), fn_ident.span()));
    let description = args
        .description
        .or_else(|| doc_comment(&func.attrs))
        .unwrap_or_else(|| LitStr::new("", Span::call_site()));
    let method = args.method.map(|method| quote!(.with_method(#method)));
    let body = args.body.map(|body| quote!(.with_body_field(#body)));
    let tags = &args.tags;
    let visibility = if matches!(func.vis, syn::Visibility::Public(_)) {
        quote!(::hostcall_tools::Visibility::Public)
    } else {
        quote!(::hostcall_tools::Visibility::Restricted)
    };

    let yields_value = output.value_type().is_some();
    let returns = output
        .value_type()
        .map(|ty| quote!(.returns::<#ty>()));
    let specs = params.iter().map(|param| {
        let name = &param.name;
        let ty = &param.ty;
        let default = param.default.as_ref().map(|expr| {
            let expr = string_literal_into(expr);
            quote! {
                .with_default(::hostcall_tools::__private::default_value::<#ty>(#expr))
            }
        });
        quote!(.param(::hostcall_tools::ParamSpec::of::<#ty>(#name) #default))
    });
    let bindings = params.iter().enumerate().map(|(index, param)| {
        let ident = format_ident!("__arg{index}");
        let name = &param.name;
        let ty = &param.ty;
        quote!(let #ident: #ty = __args.take(#index, #name)?;)
    });
    let idents = (0..params.len()).map(|index| format_ident!("__arg{index}"));
    let adapter = output.adapter(is_future);

    Ok(quote! {
        #func

        const _: () = {
            fn __signature() -> ::hostcall_tools::Signature {
                ::hostcall_tools::Signature::new(
                    ::hostcall_tools::CallingConvention::from_return_shape(#is_future, #yields_value),
                )
                #(#specs)*
                #returns
            }

            #[allow(unused_mut, unused_variables)]
            fn __invoke(
                mut __args: ::hostcall_tools::BoundArgs,
            ) -> ::hostcall_tools::ToolResult<::hostcall_tools::Invocation> {
                #(#bindings)*
                ::hostcall_tools::__private::#adapter(#fn_ident(#(#idents),*))
            }

            ::hostcall_tools::__private::inventory::submit! {
                ::hostcall_tools::ToolCandidate::new(#tool_name, __signature, __invoke)
                    .with_description(#description)
                    .with_tags(&[#(#tags),*])
                    .with_visibility(#visibility)
                    #method
                    #body
            }
        };
    })
}

fn take_params(func: &mut ItemFn) -> syn::Result<Vec<ToolParam>> {
    let mut params = Vec::new();
    for input in &mut func.sig.inputs {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        let Pat::Ident(pat) = typed.pat.as_ref() else {
            return Err(syn::Error::new_spanned(
                &typed.pat,
                "#[tool] parameters must be plain identifiers",
            ));
        };
        if let Type::Reference(reference) = typed.ty.as_ref() {
            return Err(syn::Error::new_spanned(
                reference,
                "#[tool] parameters must be owned types",
            ));
        }

        let mut default = None;
        let mut kept = Vec::with_capacity(typed.attrs.len());
        for attr in typed.attrs.drain(..) {
            if !attr.path().is_ident("arg") {
                kept.push(attr);
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    default = Some(meta.value()?.parse::<Expr>()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `default = <expr>`"))
                }
            })?;
        }
        typed.attrs = kept;

        params.push(ToolParam {
            name: unraw(&pat.ident),
            ty: (*typed.ty).clone(),
            default,
        });
    }
    Ok(params)
}

fn classify_return(func: &ItemFn) -> (bool, Output) {
    let declared = match &func.sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(ty.as_ref()),
    };
    if func.sig.asyncness.is_some() {
        return (true, classify_output(declared));
    }
    match declared.and_then(future_output) {
        Some(output) => (true, classify_output(output)),
        None => (false, classify_output(declared)),
    }
}

/// Returns the output type of `impl Future<Output = T>` or a boxed future alias.
fn future_output(ty: &Type) -> Option<Option<&Type>> {
    match ty {
        Type::ImplTrait(imp) => imp.bounds.iter().find_map(|bound| {
            let TypeParamBound::Trait(bound) = bound else {
                return None;
            };
            let segment = bound.path.segments.last()?;
            if segment.ident != "Future" {
                return None;
            }
            let PathArguments::AngleBracketed(generics) = &segment.arguments else {
                return Some(None);
            };
            Some(generics.args.iter().find_map(|arg| match arg {
                GenericArgument::AssocType(assoc) if assoc.ident == "Output" => Some(&assoc.ty),
                _ => None,
            }))
        }),
        Type::Path(path) => {
            let segment = path.path.segments.last()?;
            let boxed = ["BoxFuture", "LocalBoxFuture", "ToolFuture"];
            if !boxed.iter().any(|name| segment.ident == name) {
                return None;
            }
            Some(type_arguments(&segment.arguments).last().copied())
        }
        _ => None,
    }
}

fn classify_output(ty: Option<&Type>) -> Output {
    let Some(ty) = ty else {
        return Output::Unit;
    };
    if is_unit(ty) {
        return Output::Unit;
    }
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            let is_result = segment.ident.to_string().ends_with("Result");
            if let (true, Some(ok)) = (is_result, type_arguments(&segment.arguments).first()) {
                return if is_unit(ok) {
                    Output::UnitResult
                } else {
                    Output::ValueResult((*ok).clone())
                };
            }
        }
    }
    Output::Value(ty.clone())
}

fn type_arguments(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(generics) => generics
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn is_unit(ty: &Type) -> bool {
    match ty {
        Type::Tuple(tuple) => tuple.elems.is_empty(),
        Type::Paren(inner) => is_unit(&inner.elem),
        _ => false,
    }
}

fn string_literal_into(expr: &Expr) -> TokenStream2 {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(_), ..
        }) => quote!(::core::convert::From::from(#expr)),
        _ => quote!(#expr),
    }
}

fn doc_comment(attrs: &[Attribute]) -> Option<LitStr> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(named) => match &named.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(text),
                    ..
                }) => Some(text.value().trim().to_owned()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    let joined = lines.join(" ").trim().to_owned();
    (!joined.is_empty()).then(|| LitStr::new(&joined, Span::call_site()))
}

fn unraw(ident: &Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map_or(name.clone(), str::to_owned)
}

/// Serde attributes that change how a field or variant appears on the wire.
#[derive(Default)]
struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<String>,
    skip: bool,
    default: bool,
}

impl SerdeAttrs {
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if meta.input.peek(Token![=]) {
                        parsed.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                    } else {
                        // rename(serialize = "..", deserialize = "..") keeps the deserialize name.
                        meta.parse_nested_meta(|inner| {
                            let value = inner.value()?.parse::<LitStr>()?.value();
                            if inner.path.is_ident("deserialize") {
                                parsed.rename = Some(value);
                            }
                            Ok(())
                        })?;
                    }
                } else if meta.path.is_ident("rename_all") {
                    parsed.rename_all = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                    parsed.skip = true;
                } else if meta.path.is_ident("default") {
                    parsed.default = true;
                    skip_meta(&meta)?;
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

/// Consumes the value or nested list of a serde attribute we do not model.
fn skip_meta(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<TokenStream2>()?;
    }
    Ok(())
}

fn apply_rename_all(name: &str, rule: Option<&str>) -> String {
    let words = split_words(name);
    let lower = || words.iter().map(|w| w.to_lowercase()).collect::<Vec<_>>();
    match rule {
        Some("lowercase") => name.to_lowercase(),
        Some("UPPERCASE") => name.to_uppercase(),
        Some("snake_case") => lower().join("_"),
        Some("kebab-case") => lower().join("-"),
        Some("SCREAMING_SNAKE_CASE") => lower().join("_").to_uppercase(),
        Some("SCREAMING-KEBAB-CASE") => lower().join("-").to_uppercase(),
        Some("camelCase") => {
            let pascal = capitalize_all(&lower());
            let mut chars = pascal.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_lowercase().chain(chars).collect()
            })
        }
        Some("PascalCase") => capitalize_all(&lower()),
        _ => name.to_owned(),
    }
}

fn capitalize_all(words: &[String]) -> String {
    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

/// Splits `snake_case` and `PascalCase` identifiers into words.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for ch in name.chars() {
        if ch == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn expand_describe(input: &DeriveInput, tool_input: bool) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let container = SerdeAttrs::from_attrs(&input.attrs)?;

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::hostcall_tools::Describe));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let (body, zero) = match &input.data {
        Data::Struct(data) => {
            let Fields::Named(fields) = &data.fields else {
                return Err(syn::Error::new_spanned(
                    ident,
                    "only structs with named fields can be described",
                ));
            };
            let mut properties = Vec::new();
            let mut zeros = Vec::new();
            for field in &fields.named {
                let attrs = SerdeAttrs::from_attrs(&field.attrs)?;
                if attrs.skip {
                    continue;
                }
                let Some(field_ident) = &field.ident else {
                    continue;
                };
                let name = attrs.rename.unwrap_or_else(|| {
                    apply_rename_all(&unraw(field_ident), container.rename_all.as_deref())
                });
                let ty = &field.ty;
                let required = if attrs.default || container.default || tool_input {
                    quote!(false)
                } else {
                    quote!(!<#ty as ::hostcall_tools::Describe>::OPTIONAL)
                };
                properties.push(quote! {
                    ::hostcall_tools::Property::new(
                        #name,
                        <#ty as ::hostcall_tools::Describe>::describe(builder),
                        #required,
                    )
                });
                zeros.push(quote! {
                    map.insert(
                        ::std::string::String::from(#name),
                        <#ty as ::hostcall_tools::Describe>::zero_value(),
                    );
                });
            }
            let body = quote! {
                builder.object(::core::any::type_name::<Self>(), |builder| {
                    ::std::vec![#(#properties),*]
                })
            };
            let zero = quote! {
                fn zero_value() -> ::hostcall_tools::__private::serde_json::Value {
                    #[allow(unused_mut)]
                    let mut map = ::hostcall_tools::__private::serde_json::Map::new();
                    #(#zeros)*
                    ::hostcall_tools::__private::serde_json::Value::Object(map)
                }
            };
            (body, Some(zero))
        }
        Data::Enum(data) if !tool_input => {
            let mut names = Vec::new();
            for variant in &data.variants {
                if !matches!(variant.fields, Fields::Unit) {
                    return Err(syn::Error::new_spanned(
                        variant,
                        "only enums with unit variants can be described",
                    ));
                }
                let attrs = SerdeAttrs::from_attrs(&variant.attrs)?;
                if attrs.skip {
                    continue;
                }
                names.push(attrs.rename.unwrap_or_else(|| {
                    apply_rename_all(&variant.ident.to_string(), container.rename_all.as_deref())
                }));
            }
            let body = quote! {
                let _ = builder;
                ::hostcall_tools::Schema::enumeration([#(#names),*])
            };
            (body, None)
        }
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                if tool_input {
                    "ToolInput can only be derived for structs with named fields"
                } else {
                    "Describe can only be derived for structs and unit enums"
                },
            ));
        }
    };

    let input_items = tool_input.then(|| {
        quote! {
            const TOOL_INPUT: bool = true;

            fn default_value() -> ::core::option::Option<::hostcall_tools::__private::serde_json::Value> {
                ::hostcall_tools::__private::serde_json::to_value(
                    <Self as ::core::default::Default>::default(),
                )
                .ok()
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::hostcall_tools::Describe for #ident #ty_generics #where_clause {
            #input_items

            #zero

            fn describe(
                builder: &mut ::hostcall_tools::SchemaBuilder,
            ) -> ::hostcall_tools::Schema {
                #body
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_fn(source: &str) -> ItemFn {
        syn::parse_str(source).expect("valid function")
    }

    fn adapter_of(source: &str) -> String {
        let func = parse_fn(source);
        let (is_future, output) = classify_return(&func);
        output.adapter(is_future).to_string()
    }

    #[test]
    fn return_shapes_select_adapters() {
        assert_eq!(adapter_of("fn a() {}"), "done");
        assert_eq!(adapter_of("fn a() -> () {}"), "done");
        assert_eq!(adapter_of("fn a() -> Result<(), E> {}"), "done_result");
        assert_eq!(adapter_of("fn a() -> i64 {}"), "complete");
        assert_eq!(adapter_of("fn a() -> ToolResult<Vec<u8>> {}"), "complete_result");
        assert_eq!(adapter_of("async fn a() {}"), "detached");
        assert_eq!(adapter_of("async fn a() -> anyhow::Result<()> {}"), "detached_result");
        assert_eq!(adapter_of("async fn a() -> String {}"), "pending");
        assert_eq!(
            adapter_of("fn a() -> impl Future<Output = Result<u8, E>> {}"),
            "pending_result"
        );
        assert_eq!(adapter_of("fn a() -> LocalBoxFuture<'static, ()> {}"), "detached");
        assert_eq!(adapter_of("fn a() -> BoxFuture<'static, u8> {}"), "pending");
    }

    #[test]
    fn arg_defaults_are_stripped() {
        let mut func = parse_fn("fn a(x: i64, #[arg(default = 3)] y: i64) {}");
        let params = take_params(&mut func).expect("params");
        assert!(params[0].default.is_none());
        assert!(params[1].default.is_some());
        let FnArg::Typed(typed) = &func.sig.inputs[1] else {
            panic!("typed argument");
        };
        assert!(typed.attrs.is_empty());
    }

    #[test]
    fn references_are_rejected() {
        let mut func = parse_fn("fn a(name: &str) {}");
        assert!(take_params(&mut func).is_err());
    }

    #[test]
    fn rename_rules_match_serde() {
        assert_eq!(apply_rename_all("tick_interval", Some("camelCase")), "tickInterval");
        assert_eq!(apply_rename_all("DarkRed", Some("snake_case")), "dark_red");
        assert_eq!(apply_rename_all("DarkRed", Some("SCREAMING_SNAKE_CASE")), "DARK_RED");
        assert_eq!(apply_rename_all("dark_red", Some("PascalCase")), "DarkRed");
        assert_eq!(apply_rename_all("DarkRed", Some("kebab-case")), "dark-red");
        assert_eq!(apply_rename_all("DarkRed", None), "DarkRed");
    }

    #[test]
    fn doc_comments_become_descriptions() {
        let func = parse_fn("/// Adds two numbers.\n/// Returns the sum.\nfn add() {}");
        assert_eq!(
            doc_comment(&func.attrs).map(|lit| lit.value()),
            Some("Adds two numbers. Returns the sum.".to_owned())
        );
    }
}
