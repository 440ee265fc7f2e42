//! Predicate compiler
//!
//! `compile` is a pure function of its inputs. Nothing is accumulated on the
//! compiler, so one instance can be shared across threads.

use tracing::debug;

use crate::catalog::{FieldCatalog, FieldId, FieldMapping, FieldValue, ValueCodec};
use crate::model::{
    is_wildcard, FolderPartition, PermissionLookup, Principal, RangeBounds, SearchCriteria,
};

use super::ast::{Column, CompareOp, CompiledPredicate, Expr};
use super::errors::{CompilationError, CompileResult};
use super::letter::{escape_like, user_pattern, LetterBucket};
use super::options::{CompilerOptions, EmptyScopePolicy};

/// Fields probed by an auto-complete pattern
const AUTO_COMPLETE_FIELDS: [FieldId; 6] = [
    FieldId::DISPLAY_NAME,
    FieldId::GIVEN_NAME,
    FieldId::SUR_NAME,
    FieldId::EMAIL1,
    FieldId::EMAIL2,
    FieldId::EMAIL3,
];

/// Folder restriction derived from scope and permissions
enum FolderTerms {
    /// Emitted right after the tenant term
    Leading(Vec<Expr>),
    /// Emitted after the filter group
    Trailing(Expr),
}

/// Compiles search criteria into parameterized predicates
#[derive(Debug, Clone)]
pub struct PredicateCompiler {
    catalog: &'static FieldCatalog,
    options: CompilerOptions,
}

impl Default for PredicateCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PredicateCompiler {
    /// Compiler over the standard catalog with default options
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    /// Compiler over the standard catalog
    pub fn with_options(options: CompilerOptions) -> Self {
        Self {
            catalog: FieldCatalog::standard(),
            options,
        }
    }

    /// Active options
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Catalog used for field resolution
    pub fn catalog(&self) -> &'static FieldCatalog {
        self.catalog
    }

    /// Compiles `criteria` for `principal` under the given folder permissions.
    ///
    /// # Errors
    ///
    /// - `UnknownField` if a filter or range references an unregistered field
    /// - `FieldNotFilterable` for system fields
    /// - `InvalidValue` if a value does not parse with the field's codec
    /// - `EmptyScope` if nothing is readable and the policy is `Reject`
    pub fn compile(
        &self,
        criteria: &SearchCriteria,
        permissions: &dyn PermissionLookup,
        principal: &Principal,
    ) -> CompileResult<CompiledPredicate> {
        let mut terms = vec![Expr::eq(
            self.column(FieldId::CONTEXT_ID)?,
            FieldValue::Integer(i64::from(principal.context_id)),
        )];

        let mut trailing_scope = None;
        match self.folder_terms(criteria, permissions, principal)? {
            FolderTerms::Leading(leading) => terms.extend(leading),
            FolderTerms::Trailing(term) => trailing_scope = Some(term),
        }

        if criteria.is_first_letter() {
            let bucket = LetterBucket::parse(criteria.pattern().unwrap_or_default());
            if let Some(term) = bucket.to_expr(self.column(self.options.letter_field)?) {
                terms.push(term);
            }
        }

        let group = self.filter_group(criteria)?;
        if !group.is_empty() {
            terms.push(if criteria.is_or_mode() {
                Expr::any(group)
            } else {
                Expr::all(group)
            });
        }

        terms.extend(trailing_scope);

        if let Some(id) = criteria.ignore_record_id() {
            terms.push(Expr::Compare {
                column: self.column(FieldId::OBJECT_ID)?,
                op: CompareOp::NotEq,
                value: FieldValue::Integer(i64::from(id)),
            });
        }

        if criteria.is_auto_complete() {
            terms.push(self.channel_term()?);
        }

        terms.push(self.private_term(principal)?);

        if self.options.exclude_context_admin {
            if let Some(admin) = principal.context_admin {
                let column = self.column(FieldId::INTERNAL_USERID)?;
                terms.push(Expr::Or(vec![
                    Expr::IsNull(column),
                    Expr::Compare {
                        column,
                        op: CompareOp::NotEq,
                        value: FieldValue::Integer(i64::from(admin)),
                    },
                ]));
            }
        }

        let compiled = CompiledPredicate::new(Expr::all(terms));
        debug!(
            context_id = principal.context_id,
            user_id = principal.user_id,
            binds = compiled.bound_values().len(),
            "PREDICATE_COMPILED"
        );
        Ok(compiled)
    }

    fn column(&self, field: FieldId) -> CompileResult<Column> {
        Ok(Column::from(self.catalog.resolve(field)?))
    }

    fn filterable(&self, field: FieldId) -> CompileResult<&'static FieldMapping> {
        let mapping = self.catalog.resolve(field)?;
        if !mapping.filterable {
            return Err(CompilationError::FieldNotFilterable(field));
        }
        Ok(mapping)
    }

    fn folder_terms(
        &self,
        criteria: &SearchCriteria,
        permissions: &dyn PermissionLookup,
        principal: &Principal,
    ) -> CompileResult<FolderTerms> {
        let partition = if criteria.folder_scope().is_empty() {
            FolderPartition::compute(permissions.visible_folders(), permissions)
        } else {
            FolderPartition::compute(criteria.folder_scope().iter().copied(), permissions)
        };

        if partition.is_empty() {
            return match self.options.empty_scope_policy {
                EmptyScopePolicy::Reject => Err(CompilationError::EmptyScope),
                EmptyScopePolicy::EmptyResult => Ok(FolderTerms::Leading(vec![Expr::Const(false)])),
            };
        }

        let folder = self.column(FieldId::FOLDER_ID)?;
        let creator = self.column(FieldId::CREATED_BY)?;
        let principal_value = FieldValue::Integer(i64::from(principal.user_id));

        if partition.len() == 1 {
            let (id, own_only) = match partition.all.iter().next() {
                Some(id) => (*id, false),
                None => match partition.own.iter().next() {
                    Some(id) => (*id, true),
                    None => return Ok(FolderTerms::Leading(vec![Expr::Const(false)])),
                },
            };
            let mut leading = vec![Expr::eq(folder, FieldValue::Integer(i64::from(id)))];
            if own_only {
                leading.push(Expr::eq(creator, principal_value));
            }
            return Ok(FolderTerms::Leading(leading));
        }

        let mut sides = Vec::with_capacity(2);
        if !partition.all.is_empty() {
            sides.push(Expr::In {
                column: folder,
                values: Self::folder_values(&partition.all),
            });
        }
        if !partition.own.is_empty() {
            sides.push(Expr::And(vec![
                Expr::In {
                    column: folder,
                    values: Self::folder_values(&partition.own),
                },
                Expr::eq(creator, principal_value),
            ]));
        }
        Ok(FolderTerms::Trailing(Expr::any(sides)))
    }

    fn folder_values<'a>(folders: impl IntoIterator<Item = &'a u32>) -> Vec<FieldValue> {
        folders
            .into_iter()
            .map(|id| FieldValue::Integer(i64::from(*id)))
            .collect()
    }

    fn filter_group(&self, criteria: &SearchCriteria) -> CompileResult<Vec<Expr>> {
        let mut group = Vec::new();

        if !criteria.is_first_letter() {
            if let Some(pattern) = criteria.pattern().filter(|p| !is_wildcard(p)) {
                if criteria.is_auto_complete() {
                    group.push(self.auto_complete_term(pattern)?);
                } else {
                    let mapping = self.catalog.resolve(self.options.display_field)?;
                    group.extend(self.value_term(mapping, pattern)?);
                }
            }
        }

        for (field, value) in criteria.per_field_filters() {
            let mapping = self.filterable(*field)?;
            if is_wildcard(value) {
                continue;
            }
            group.extend(self.value_term(mapping, value)?);
        }

        for (field, bounds) in criteria.ranges() {
            let mapping = self.filterable(*field)?;
            group.extend(self.range_term(mapping, bounds)?);
        }

        Ok(group)
    }

    fn value_term(&self, mapping: &FieldMapping, raw: &str) -> CompileResult<Option<Expr>> {
        let column = Column::from(mapping);
        let term = match mapping.codec {
            ValueCodec::List => {
                let tokens: Vec<Expr> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|token| !is_wildcard(token))
                    .map(|token| Expr::Like {
                        column,
                        pattern: format!("%{}%", escape_like(token)),
                        fold_case: true,
                    })
                    .collect();
                if tokens.is_empty() {
                    return Ok(None);
                }
                Expr::Or(tokens)
            }
            ValueCodec::Text => Expr::Like {
                column,
                pattern: user_pattern(raw, self.options.substring_search),
                fold_case: false,
            },
            ValueCodec::Integer | ValueCodec::Boolean | ValueCodec::Timestamp => {
                Expr::eq(column, mapping.encode(raw)?)
            }
        };
        Ok(Some(term))
    }

    fn range_term(&self, mapping: &FieldMapping, bounds: &RangeBounds) -> CompileResult<Option<Expr>> {
        let column = Column::from(mapping);
        let mut sides = Vec::with_capacity(2);
        if let Some(lower) = bounds.lower_bound() {
            sides.push(Expr::Compare {
                column,
                op: CompareOp::Gte,
                value: mapping.encode(lower)?,
            });
        }
        if let Some(upper) = bounds.upper_bound() {
            sides.push(Expr::Compare {
                column,
                op: CompareOp::Lte,
                value: mapping.encode(upper)?,
            });
        }
        Ok(if sides.is_empty() {
            None
        } else {
            Some(Expr::all(sides))
        })
    }

    fn auto_complete_term(&self, pattern: &str) -> CompileResult<Expr> {
        let like = user_pattern(pattern, false);
        let terms = AUTO_COMPLETE_FIELDS
            .iter()
            .map(|field| {
                Ok(Expr::Like {
                    column: self.column(*field)?,
                    pattern: like.clone(),
                    fold_case: false,
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(Expr::Or(terms))
    }

    fn channel_term(&self) -> CompileResult<Expr> {
        Ok(Expr::Or(vec![
            Expr::NotEmpty(self.column(FieldId::EMAIL1)?),
            Expr::NotEmpty(self.column(FieldId::EMAIL2)?),
            Expr::NotEmpty(self.column(FieldId::EMAIL3)?),
            Expr::eq(
                self.column(FieldId::MARK_AS_DISTRIBUTION_LIST)?,
                FieldValue::Bool(true),
            ),
        ]))
    }

    fn private_term(&self, principal: &Principal) -> CompileResult<Expr> {
        let flag = self.column(FieldId::PRIVATE_FLAG)?;
        Ok(Expr::Or(vec![
            Expr::IsNull(flag),
            Expr::eq(flag, FieldValue::Bool(false)),
            Expr::eq(
                self.column(FieldId::CREATED_BY)?,
                FieldValue::Integer(i64::from(principal.user_id)),
            ),
        ]))
    }
}
