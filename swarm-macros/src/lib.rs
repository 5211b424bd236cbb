use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemFn, LitStr};

/// Proc macro to denote a Transaction
///
/// Wraps an `async fn` returning `Result<T, E>` so that every call is timed and counted in the
/// statistics of the swarm it runs in, next to the HTTP requests made through `swarm::Client`.
/// The entry is named after the function unless a name is given.
///
/// # Example
/// ```ignore
/// use swarm::prelude::*;
///
/// #[transaction]
/// async fn login(client: &Client) -> Result<(), RequestError> {
///     ...
/// }
///
/// #[transaction("checkout flow")]
/// async fn checkout(client: &Client) -> Result<(), RequestError> {
///     ...
/// }
/// ```
#[proc_macro_attribute]
pub fn transaction(attr: TokenStream, item: TokenStream) -> TokenStream {
    transaction_internal(attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn transaction_internal(attr: TokenStream2, item: TokenStream2) -> syn::Result<TokenStream2> {
    let input = syn::parse2::<ItemFn>(item)?;

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    if sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            sig.fn_token,
            "#[transaction] only works on async functions",
        ));
    }

    let name = if attr.is_empty() {
        LitStr::new(&sig.ident.to_string(), sig.ident.span())
    } else {
        syn::parse2::<LitStr>(attr)?
    };
    let stmts = &block.stmts;

    Ok(quote! {
        #(#attrs)* #vis #sig {
            ::swarm::transaction::transaction_hook(
                ::swarm::TRANSACTION_KIND,
                #name,
                async move {
                    #(#stmts)*
                },
            )
            .await
        }
    })
}
