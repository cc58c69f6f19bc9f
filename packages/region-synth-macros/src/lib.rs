use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Expr, GenericArgument, Ident, PathArguments, Token, Type, Visibility,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

mod kw {
    syn::custom_keyword!(nested);
}

/// How a field is filled from its partial counterpart.
enum FieldKind {
    /// `name: Type = default`, replaced when the partial sets it.
    Plain { default_value: Expr },
    /// `nested name: Type`, a struct generated by `config!` itself, merged
    /// field by field.
    Nested { partial_ty: Ident },
}

struct ConfigField {
    attrs: Vec<Attribute>,
    name: Ident,
    ty: Type,
    kind: FieldKind,
}

impl Parse for ConfigField {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let nested = input.peek(kw::nested) && input.peek2(Ident);
        if nested {
            input.parse::<kw::nested>()?;
        }

        let name: Ident = input.parse()?;
        input.parse::<Token![:]>()?;
        let ty: Type = input.parse()?;

        let kind = if nested {
            FieldKind::Nested {
                partial_ty: partial_name_of(&ty)?,
            }
        } else {
            input.parse::<Token![=]>()?;
            FieldKind::Plain {
                default_value: input.parse()?,
            }
        };

        Ok(ConfigField {
            attrs,
            name,
            ty,
            kind,
        })
    }
}

struct ConfigInput {
    attrs: Vec<Attribute>,
    vis: Visibility,
    name: Ident,
    fields: Punctuated<ConfigField, Token![,]>,
}

impl Parse for ConfigInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis: Visibility = input.parse()?;
        input.parse::<Token![struct]>()?;
        let name: Ident = input.parse()?;
        let content;
        syn::braced!(content in input);
        let fields = content.parse_terminated(ConfigField::parse, Token![,])?;
        Ok(ConfigInput {
            attrs,
            vis,
            name,
            fields,
        })
    }
}

/// `Foo` becomes `PartialFoo`.
fn partial_name_of(ty: &Type) -> syn::Result<Ident> {
    match ty {
        Type::Path(tp) if tp.qself.is_none() => match tp.path.segments.last() {
            Some(seg) => Ok(format_ident!("Partial{}", seg.ident)),
            None => Err(syn::Error::new_spanned(ty, "expected a config type")),
        },
        _ => Err(syn::Error::new_spanned(
            ty,
            "nested fields need a type generated by config!",
        )),
    }
}

/// The `T` of `Option<T>`, if the type is spelled that way.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(tp) = ty else {
        return None;
    };
    let seg = tp.path.segments.last()?;
    if seg.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn partial_field(f: &ConfigField) -> TokenStream2 {
    let name = &f.name;
    let ty = &f.ty;
    let partial_ty = match &f.kind {
        FieldKind::Nested { partial_ty } => quote! { Option<#partial_ty> },
        FieldKind::Plain { .. } if option_inner(ty).is_some() => quote! { #ty },
        FieldKind::Plain { .. } => quote! { Option<#ty> },
    };
    quote! {
        #[serde(default)]
        #name: #partial_ty
    }
}

fn merge_statement(f: &ConfigField) -> TokenStream2 {
    let name = &f.name;
    match &f.kind {
        FieldKind::Nested { .. } => quote! {
            if let Some(nested) = partial.#name {
                self.#name.merge(nested);
            }
        },
        FieldKind::Plain { .. } if option_inner(&f.ty).is_some() => quote! {
            if partial.#name.is_some() {
                self.#name = partial.#name;
            }
        },
        FieldKind::Plain { .. } => quote! {
            if let Some(value) = partial.#name {
                self.#name = value;
            }
        },
    }
}

fn default_value(f: &ConfigField) -> TokenStream2 {
    match &f.kind {
        FieldKind::Plain { default_value } => quote! { #default_value },
        FieldKind::Nested { .. } => {
            let ty = &f.ty;
            quote! { <#ty as Default>::default() }
        }
    }
}

fn accessors(f: &ConfigField) -> TokenStream2 {
    let name = &f.name;
    let ty = &f.ty;
    let with_name = format_ident!("with_{}", name);
    let set_name = format_ident!("set_{}", name);
    let get_name = format_ident!("get_{}", name);
    quote! {
        pub fn #with_name(mut self, #name: #ty) -> Self {
            self.#name = #name;
            self
        }
        pub fn #set_name(&mut self, #name: #ty) {
            self.#name = #name;
        }
        pub fn #get_name(&self) -> &#ty {
            &self.#name
        }
    }
}

/// Generates a configuration struct together with a `Partial*` struct that is
/// deserialized from TOML. Every key of the partial struct is optional and
/// unknown keys are rejected. Partial values are layered on top of the
/// defaults with `merge`, nested configurations key by key.
///
/// ```ignore
/// config! {
///     /// Settings of a run.
///     pub struct RunConfig {
///         /// Abort after the first failure.
///         quick_fail: bool = false,
///         nested logger: LoggerConfig,
///     }
/// }
/// ```
#[proc_macro]
pub fn config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as ConfigInput);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let struct_name = &input.name;
    let partial_struct_name = format_ident!("Partial{}", struct_name);

    let fields = input.fields.iter().map(|f| {
        let field_attrs = &f.attrs;
        let name = &f.name;
        let ty = &f.ty;
        quote! {
            #( #field_attrs )*
            #name: #ty
        }
    });
    let partial_fields = input.fields.iter().map(partial_field);
    let merge_statements = input.fields.iter().map(merge_statement);
    let methods = input.fields.iter().map(accessors);
    let default_assignments = input.fields.iter().map(|f| {
        let name = &f.name;
        let value = default_value(f);
        quote! { #name: #value }
    });

    let expanded = quote! {
        #( #attrs )*
        #[derive(Debug, Clone, serde::Serialize)]
        #vis struct #struct_name {
            #( #fields, )*
        }

        #[derive(Debug, Clone, Default, serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        #vis struct #partial_struct_name {
            #( #partial_fields, )*
        }

        impl #struct_name {
            /// Overrides every value that is set in `partial`.
            pub fn merge(&mut self, partial: #partial_struct_name) {
                #( #merge_statements )*
            }

            pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
                let mut config = Self::default();
                config.merge_toml_str(content)?;
                Ok(config)
            }

            pub fn merge_toml_str(&mut self, content: &str) -> anyhow::Result<()> {
                self.merge(toml::from_str::<#partial_struct_name>(content)?);
                Ok(())
            }

            pub fn merge_file<P: AsRef<std::path::Path>>(&mut self, file_path: P) -> anyhow::Result<()> {
                let content = std::fs::read_to_string(file_path)?;
                self.merge_toml_str(&content)
            }

            #( #methods )*
        }

        impl Default for #struct_name {
            fn default() -> Self {
                #struct_name {
                    #( #default_assignments, )*
                }
            }
        }
    };
    TokenStream::from(expanded)
}
