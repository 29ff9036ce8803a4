use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::classify::{classify, label_role, Class, LabelRole};
use crate::error::Error;
use crate::lexer::tokenize;
use crate::span::Span;
use crate::symbol::Tag;

// Label table of label text -> sequence position, in definition order
type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// A classified word. Never changes once built.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub text: String,
    pub tag: Tag,
    /// Only meaningful for labels.
    pub role: LabelRole,
    pub span: Span,
}

/// Immutable instruction sequence plus label table, ready to run.
#[derive(Debug)]
pub struct Program {
    tokens: Vec<Token>,
    labels: FxMap<String, usize>,
}

impl Program {
    /// Build a program from source text.
    ///
    /// The first pass classifies every word and aborts on an unknown opcode. Label roles are
    /// decided per token by looking at the token right before it. The second pass records every
    /// definition (first one wins) and then checks that each jump target exists.
    pub fn build(src: &str) -> Result<Program, Error> {
        let mut tokens: Vec<Token> = Vec::new();
        for word in tokenize(src) {
            let tag = match classify(word.text) {
                Class::Tagged(tag) => tag,
                Class::UnknownOpcode => {
                    return Err(Error::UnknownOpcode {
                        text: word.text.to_string(),
                        span: word.span.into(),
                    })
                }
            };
            tokens.push(Token {
                text: word.text.to_string(),
                tag,
                role: LabelRole::Definition,
                span: word.span,
            });
        }

        // Roles depend only on the preceding tag, which is fixed after the first pass
        let roles: Vec<LabelRole> = (0..tokens.len())
            .map(|i| label_role(i.checked_sub(1).map(|prev| tokens[prev].tag)))
            .collect();
        for (token, role) in tokens.iter_mut().zip(roles) {
            token.role = role;
        }

        let mut labels = FxMap::default();
        for (pos, token) in tokens.iter().enumerate() {
            if token.tag == Tag::Label && token.role == LabelRole::Definition {
                labels.entry(token.text.clone()).or_insert(pos);
            }
        }
        if let Some(undefined) = tokens.iter().find(|token| {
            token.tag == Tag::Label
                && token.role == LabelRole::Reference
                && !labels.contains_key(&token.text)
        }) {
            return Err(Error::UndefinedLabel {
                label: undefined.text.clone(),
                span: undefined.span.into(),
            });
        }

        Ok(Program { tokens, labels })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn get(&self, pos: usize) -> Option<&Token> {
        self.tokens.get(pos)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Position of a label definition.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Label definitions in the order they were first defined.
    pub fn labels(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.labels.iter().map(|(name, pos)| (name.as_str(), *pos))
    }
}
