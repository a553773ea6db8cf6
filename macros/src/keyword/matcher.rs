use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::LitByteStr;

use super::table::KeywordTable;

/// The `Keyword` enumeration and its first-match lookup, in table order.
pub struct KeywordEnum<'a>(pub &'a KeywordTable);

impl ToTokens for KeywordEnum<'_> {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let entries = &self.0 .0;

        let variants = entries.iter().map(|entry| &entry.ident).collect::<Vec<_>>();
        let texts = entries.iter().map(|entry| &entry.text).collect::<Vec<_>>();
        let prefixes = entries.iter().map(|entry| entry.is_prefix()).collect::<Vec<_>>();

        let arms = entries.iter().map(|entry| {
            let ident = &entry.ident;
            let bytes = LitByteStr::new(entry.text.value().as_bytes(), entry.text.span());
            if entry.is_prefix() {
                quote! {
                    if let ::core::option::Option::Some(argument) = token.strip_prefix(#bytes) {
                        return ::core::option::Option::Some((Self::#ident, argument));
                    }
                }
            } else {
                quote! {
                    if token == #bytes {
                        return ::core::option::Option::Some((Self::#ident, &token[token.len()..]));
                    }
                }
            }
        });

        quote! {
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum Keyword {
                #( #variants, )*
            }

            impl Keyword {
                /// Every keyword, in matching order.
                pub const ALL: &'static [Keyword] = &[ #( Keyword::#variants, )* ];

                pub const fn text(self) -> &'static str {
                    match self {
                        #( Self::#variants => #texts, )*
                    }
                }

                /// Whether the keyword is a prefix followed by an argument.
                pub const fn takes_argument(self) -> bool {
                    match self {
                        #( Self::#variants => #prefixes, )*
                    }
                }

                /// Finds the first keyword matching `token`, returning it with the argument text.
                pub fn split(token: &[u8]) -> ::core::option::Option<(Self, &[u8])> {
                    #( #arms )*
                    ::core::option::Option::None
                }
            }
        }
        .to_tokens(tokens)
    }
}
