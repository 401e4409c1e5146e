use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject dependencies.
///
/// Every test gets a fresh in-memory [`crate::engine::Engine`]. Injectable
/// dependencies are [`rocket::local::asynchronous::Client`], the `Engine`
/// itself, the [`crate::notify::RecordingNotifier`] it reports to, and, with
/// `#[backend_test(committee)]`, the seeded [`crate::engine::examples::Committee`].
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    let seed = match parse_macro_input!(args as Option<Ident>) {
        None => false,
        Some(arg) if arg == "committee" => true,
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `committee` or nothing")
                .into_compile_error()
                .into();
        }
    };

    // Extract type information and reject invalid function signatures.
    let injected = match check_sig(&item_fn.sig, seed) {
        Ok(injected) => injected,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };
    let wants_client = injected.iter().any(|arg| arg.to_string() == "rocket_client");

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let maybe_seed = if seed {
        quote! {
            let committee = crate::engine::examples::Committee::seed(&engine).await;
        }
    } else {
        quote! {}
    };
    let maybe_client = if wants_client {
        quote! {
            let rocket_client = rocket::local::asynchronous::Client::tracked(
                crate::rocket_for_services(engine.clone()),
            )
            .await
            .unwrap();
        }
    } else {
        quote! {}
    };

    // Rewrite the test function.
    quote! {
        #[test]
        #[allow(unused_variables)]
        fn #name() {
            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                // Test setup.
                let notifier = crate::notify::RecordingNotifier::default();
                let engine = crate::engine::Engine::in_memory(std::sync::Arc::new(notifier.clone()));
                #maybe_seed
                #maybe_client

                #new_name(#(#injected),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, map each parameter to the dependency it
/// receives, and reject unknown parameters.
fn check_sig(sig: &Signature, seed: bool) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injected: Vec<TokenStream2> = vec![];
    for input in &sig.inputs {
        let type_ident = match input {
            FnArg::Typed(pat_type) => match (&*pat_type.pat, &*pat_type.ty) {
                (Pat::Ident(_), Type::Path(type_path)) => type_path.path.segments.last().map(|s| &s.ident),
                _ => None,
            },
            FnArg::Receiver(_) => None,
        };
        let arg = match type_ident {
            Some(ident) if ident == "Client" => quote! { rocket_client },
            Some(ident) if ident == "Engine" => quote! { engine.clone() },
            Some(ident) if ident == "RecordingNotifier" => quote! { notifier.clone() },
            Some(ident) if ident == "Committee" => {
                if !seed {
                    return Err(syn::Error::new(
                        input.span(),
                        "A `Committee` is only available with `#[backend_test(committee)]`",
                    ));
                }
                quote! { committee.clone() }
            }
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "Expected one of `Client`, `Engine`, `RecordingNotifier` or `Committee`",
                ));
            }
        };
        if injected.iter().any(|existing| existing.to_string() == arg.to_string()) {
            return Err(syn::Error::new(
                input.span(),
                "Test cannot accept the same dependency twice",
            ));
        }
        injected.push(arg);
    }

    Ok(injected)
}
