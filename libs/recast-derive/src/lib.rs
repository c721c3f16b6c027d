use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Visibility};

/// Derive macro for record reflection.
///
/// Generates `recast::Reflect` and `recast::Record` impls for the annotated
/// struct, describing every declared field in declaration order.
///
/// - `pub` fields are exported and convertible; private fields are
///   described as unexported and never touched.
/// - `#[convert(tag = "...")]`: `"-"` ignores the field, `"+"` flattens it,
///   any other value renames it.
/// - `#[convert(embedded)]`: anonymous embedding; flattened unless a tag
///   renames it.
///
/// The struct must implement `Clone` and `Default`.
///
/// # Example
///
/// ```ignore
/// #[derive(Reflect, Clone, Default)]
/// pub struct Order {
///     #[convert(tag = "OrderCode")]
///     pub code: i64,
///
///     #[convert(embedded)]
///     pub audit: Audit,
///
///     #[convert(tag = "-")]
///     pub scratch: String,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(convert))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Reflect only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Reflect only supports structs",
            ))
        }
    };

    let mut field_desc_tokens = Vec::new();
    let mut field_ref_arms = Vec::new();
    let mut field_mut_arms = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let field_name = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;
        let field_name_str = field_name.unraw().to_string();
        let field_ty = &field.ty;
        let exported = !matches!(field.vis, Visibility::Inherited);

        // Parse #[convert(...)] attribute.
        let mut tag: Option<String> = None;
        let mut embedded = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("convert") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("tag") {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() {
                        return Err(meta.error("convert tag must not be empty"));
                    }
                    tag = Some(value.value());
                } else if meta.path.is_ident("embedded") {
                    embedded = true;
                } else {
                    return Err(meta.error("unknown convert option (expected `tag` or `embedded`)"));
                }
                Ok(())
            })?;
        }

        let ignored = tag.as_deref() == Some("-");
        let tag_expr = match &tag {
            Some(t) => quote! { Some(#t) },
            None => quote! { None },
        };

        // Unexported and ignored fields are only described, so their types
        // need not implement Reflect.
        let ty_expr = if exported && !ignored {
            quote! { <#field_ty as recast::Reflect>::type_desc() }
        } else {
            quote! { recast::TypeDesc::opaque::<#field_ty>() }
        };

        field_desc_tokens.push(quote! {
            recast::FieldDesc {
                name: #field_name_str,
                index: #index,
                tag: #tag_expr,
                embedded: #embedded,
                exported: #exported,
                ty: #ty_expr,
            }
        });

        if exported && !ignored {
            field_ref_arms.push(quote! {
                #index => Some(&self.#field_name as &dyn recast::Reflect),
            });
            field_mut_arms.push(quote! {
                #index => Some(&mut self.#field_name as &mut dyn recast::Reflect),
            });
        }
    }

    let expanded = quote! {
        impl recast::Reflect for #name {
            fn type_desc() -> recast::TypeDesc {
                recast::TypeDesc::new::<Self>(|| {
                    recast::Shape::Record(vec![
                        #(#field_desc_tokens),*
                    ])
                })
            }

            fn reflect_ref(&self) -> recast::ReflectRef<'_> {
                recast::ReflectRef::Record(self)
            }

            fn reflect_mut(&mut self) -> recast::ReflectMut<'_> {
                recast::ReflectMut::Record(self)
            }
        }

        impl recast::Record for #name {
            fn field(&self, index: usize) -> Option<&dyn recast::Reflect> {
                match index {
                    #(#field_ref_arms)*
                    _ => None,
                }
            }

            fn field_mut(&mut self, index: usize) -> Option<&mut dyn recast::Reflect> {
                match index {
                    #(#field_mut_arms)*
                    _ => None,
                }
            }
        }
    };

    Ok(TokenStream::from(expanded))
}
