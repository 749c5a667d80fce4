//! Integration tests for result-set mapping resolution.

use rowmap_core::catalog::{
    AttributeDef, CollectionElement, EmbeddableDef, EntityDef, FetchProfile, FetchTiming,
    ForeignKeySide, MappingMetamodel, PluralDef, ScalarType, ToOneDef,
};
use rowmap_core::results::{
    attribute_result, entity, fetch, instantiation, joined_fetch, legacy_fetch, scalar, scalar_at,
    DomainResult, Fetch, LockMode, ResultSetMapping, ScalarResultBuilder,
};
use rowmap_core::{
    Error, JdbcType, JdbcValuesMapping, LoadQueryInfluencers, ResultSetMetadata, ResultsConfig,
    SessionFactory,
};
use std::sync::Arc;

struct TestContext {
    factory: SessionFactory,
    influencers: LoadQueryInfluencers,
}

impl TestContext {
    fn new(metamodel: MappingMetamodel) -> Self {
        Self::with_config(metamodel, ResultsConfig::default())
    }

    fn with_config(metamodel: MappingMetamodel, config: ResultsConfig) -> Self {
        Self {
            factory: SessionFactory::with_config(metamodel, config),
            influencers: LoadQueryInfluencers::default(),
        }
    }

    fn resolve(
        &self,
        mapping: &ResultSetMapping,
        metadata: &ResultSetMetadata,
    ) -> rowmap_core::Result<JdbcValuesMapping> {
        mapping.resolve(metadata, &self.influencers, &self.factory)
    }
}

fn setup_person_schema() -> MappingMetamodel {
    let person = EntityDef::new("Person", AttributeDef::basic("id", "ID", ScalarType::Int64))
        .with_version(AttributeDef::basic("version", "VERSION", ScalarType::Int32))
        .with_attribute(AttributeDef::basic("email", "EMAIL", ScalarType::String))
        .with_attribute(AttributeDef::basic("age", "AGE", ScalarType::Int32));
    MappingMetamodel::new(1).with_entity(person)
}

fn setup_company_schema(employer_fetch: FetchTiming) -> MappingMetamodel {
    let person = EntityDef::new("Person", AttributeDef::basic("id", "ID", ScalarType::Int64))
        .with_attribute(AttributeDef::basic("name", "NAME", ScalarType::String))
        .with_attribute(AttributeDef::to_one(
            "employer",
            ToOneDef::new("Company", vec!["EMPLOYER_ID".into()]).with_fetch(employer_fetch),
        ));
    let company = EntityDef::new(
        "Company",
        AttributeDef::basic("id", "COMPANY_ID", ScalarType::Int64),
    )
    .with_attribute(AttributeDef::basic("name", "COMPANY_NAME", ScalarType::String));

    MappingMetamodel::new(1)
        .with_entity(person)
        .with_entity(company)
        .with_fetch_profile(FetchProfile::new("with-employer").with_fetch("Person", "employer"))
}

fn company_metadata() -> ResultSetMetadata {
    ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("NAME", JdbcType::Varchar)
        .with_column("EMPLOYER_ID", JdbcType::BigInt)
        .with_column("COMPANY_ID", JdbcType::BigInt)
        .with_column("COMPANY_NAME", JdbcType::Varchar)
}

fn setup_inheritance_schema() -> MappingMetamodel {
    let person = EntityDef::new("Person", AttributeDef::basic("id", "ID", ScalarType::Int64))
        .with_case_discriminator()
        .with_version(AttributeDef::basic("version", "VERSION", ScalarType::Int32))
        .with_attribute(AttributeDef::basic("name", "NAME", ScalarType::String));
    let employee = EntityDef::subclass("Employee", "Person")
        .with_attribute(AttributeDef::basic("salary", "SALARY", ScalarType::Float64));
    MappingMetamodel::new(1).with_entity(person).with_entity(employee)
}

/// Person (immediate employer, inverse passport), Company, and a Passport
/// whose identifier is its owning Person.
fn setup_passport_schema(owner_fetch: FetchTiming) -> MappingMetamodel {
    let person = EntityDef::new("Person", AttributeDef::basic("id", "ID", ScalarType::Int64))
        .with_attribute(AttributeDef::basic("name", "NAME", ScalarType::String))
        .with_attribute(AttributeDef::to_one(
            "employer",
            ToOneDef::new("Company", vec!["EMPLOYER_ID".into()]).with_fetch(FetchTiming::Immediate),
        ))
        .with_attribute(AttributeDef::to_one("passport", ToOneDef::inverse("Passport")));
    let company = EntityDef::new(
        "Company",
        AttributeDef::basic("id", "COMPANY_ID", ScalarType::Int64),
    );
    let passport = EntityDef::new(
        "Passport",
        AttributeDef::to_one(
            "owner",
            ToOneDef::new("Person", vec!["OWNER_ID".into()]).with_fetch(owner_fetch),
        ),
    )
    .with_attribute(AttributeDef::basic("number", "NUMBER", ScalarType::String));

    MappingMetamodel::new(1)
        .with_entity(person)
        .with_entity(company)
        .with_entity(passport)
}

fn setup_node_schema() -> MappingMetamodel {
    let node = EntityDef::new("Node", AttributeDef::basic("id", "ID", ScalarType::Int64))
        .with_attribute(AttributeDef::to_one(
            "parent",
            ToOneDef::new("Node", vec!["PARENT_ID".into()]),
        ));
    MappingMetamodel::new(1).with_entity(node)
}

fn setup_salaried_schema() -> MappingMetamodel {
    let person = EntityDef::new("Person", AttributeDef::basic("id", "ID", ScalarType::Int64))
        .with_case_discriminator()
        .with_attribute(AttributeDef::basic("name", "NAME", ScalarType::String));
    let employee = EntityDef::subclass("Employee", "Person")
        .with_attribute(AttributeDef::basic("salary", "SALARY", ScalarType::Float64));
    let contractor = EntityDef::subclass("Contractor", "Person")
        .with_attribute(AttributeDef::basic("salary", "SALARY", ScalarType::Float64));
    MappingMetamodel::new(1)
        .with_entity(person)
        .with_entity(employee)
        .with_entity(contractor)
}

fn setup_order_schema() -> MappingMetamodel {
    let order = EntityDef::new("Order", AttributeDef::basic("id", "ORDER_ID", ScalarType::Int64))
        .with_attribute(AttributeDef::plural(
            "lines",
            PluralDef::new(CollectionElement::Entity {
                target: "OrderLine".into(),
            })
            .with_key_columns(vec!["LINE_ORDER_ID".into()]),
        ));
    let line = EntityDef::new("OrderLine", AttributeDef::basic("id", "LINE_ID", ScalarType::Int64))
        .with_attribute(AttributeDef::basic("product", "PRODUCT", ScalarType::String));
    MappingMetamodel::new(1).with_entity(order).with_entity(line)
}

fn fetch_named<'r>(fetches: &'r [Fetch], name: &str) -> &'r Fetch {
    fetches
        .iter()
        .find(|fetch| fetch.path().local_name() == name)
        .unwrap_or_else(|| panic!("no fetch named {name}"))
}

fn entity_fetches(result: &DomainResult) -> &[Fetch] {
    match result {
        DomainResult::Entity(entity) => &entity.fetches,
        other => panic!("expected entity result, got {other:?}"),
    }
}

// ============================================================================
// Auto-discovery
// ============================================================================

#[test]
fn test_auto_discovery_yields_one_scalar_per_column() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("EMAIL", JdbcType::Varchar)
        .with_column("AGE", JdbcType::Integer);

    let resolved = ctx.resolve(&ResultSetMapping::dynamic("auto"), &metadata).unwrap();

    assert_eq!(resolved.row_size(), 3);
    assert_eq!(resolved.domain_results().len(), 3);
    assert_eq!(resolved.selections().len(), 3);
    for (index, result) in resolved.domain_results().iter().enumerate() {
        match result {
            DomainResult::Basic(basic) => assert_eq!(basic.position, index),
            other => panic!("expected scalar result, got {other:?}"),
        }
    }
    match &resolved.domain_results()[2] {
        DomainResult::Basic(basic) => {
            assert_eq!(basic.jdbc_type, ScalarType::Int32);
            assert_eq!(basic.result_variable.as_deref(), Some("AGE"));
        }
        other => panic!("expected scalar result, got {other:?}"),
    }
}

#[test]
fn test_auto_discovery_tolerates_duplicate_aliases() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("id", JdbcType::BigInt);

    let resolved = ctx.resolve(&ResultSetMapping::dynamic("auto"), &metadata).unwrap();
    assert_eq!(resolved.domain_results().len(), 2);
}

#[test]
fn test_resolution_is_repeatable() {
    let ctx = TestContext::new(setup_company_schema(FetchTiming::Delayed));
    let mut mapping = ResultSetMapping::dynamic("people");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();

    let first = ctx.resolve(&mapping, &company_metadata()).unwrap();
    let second = ctx.resolve(&mapping, &company_metadata()).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Explicit results
// ============================================================================

#[test]
fn test_scalar_then_entity_scenario() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("name", JdbcType::Varchar)
        .with_column("EMAIL", JdbcType::Varchar)
        .with_column("AGE", JdbcType::Integer)
        .with_column("VERSION", JdbcType::Integer);

    let mut mapping = ResultSetMapping::dynamic("scenario");
    mapping.add_result_builder(scalar("name")).unwrap();
    mapping
        .add_result_builder(entity("e", "Person", &ctx.factory).unwrap())
        .unwrap();

    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    let results = resolved.domain_results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].positions(), vec![1]);
    assert!(matches!(results[1], DomainResult::Entity(_)));
    assert_eq!(results[1].positions(), vec![0, 2, 3, 4]);
}

#[test]
fn test_attribute_and_instantiation_results() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("MAIL", JdbcType::Varchar)
        .with_column("AGE", JdbcType::Integer);

    let mut mapping = ResultSetMapping::dynamic("contact");
    mapping
        .add_result_builder(attribute_result("MAIL", "Person", "email", &ctx.factory).unwrap())
        .unwrap();
    mapping
        .add_result_builder(instantiation(
            "Contact",
            vec![scalar("MAIL").into(), scalar("AGE").into()],
        ))
        .unwrap();

    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    match &resolved.domain_results()[0] {
        DomainResult::Basic(basic) => {
            assert_eq!(basic.position, 0);
            assert_eq!(basic.jdbc_type, ScalarType::String);
        }
        other => panic!("expected scalar result, got {other:?}"),
    }
    match &resolved.domain_results()[1] {
        DomainResult::Instantiation(contact) => {
            assert_eq!(contact.target, "Contact");
            assert_eq!(contact.arguments.len(), 2);
        }
        other => panic!("expected instantiation result, got {other:?}"),
    }
    // MAIL is shared by the attribute result and the first argument.
    assert_eq!(resolved.selections().len(), 2);
}

#[test]
fn test_positional_scalar_after_entity_is_rejected() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("EMAIL", JdbcType::Varchar)
        .with_column("AGE", JdbcType::Integer)
        .with_column("VERSION", JdbcType::Integer);

    let mut leading = ResultSetMapping::dynamic("leading");
    leading.add_result_builder(ScalarResultBuilder::default()).unwrap();
    leading
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();
    assert!(ctx.resolve(&leading, &metadata).is_ok());

    let mut trailing = ResultSetMapping::dynamic("trailing");
    trailing
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();
    trailing.add_result_builder(ScalarResultBuilder::default()).unwrap();
    assert_eq!(
        ctx.resolve(&trailing, &metadata).unwrap_err(),
        Error::PositionalSelectionDisallowed { result_position: 1 }
    );
}

#[test]
fn test_duplicate_explicit_position_is_rejected_at_definition() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("EMAIL", JdbcType::Varchar)
        .with_column("AGE", JdbcType::Integer);

    let mut mapping = ResultSetMapping::dynamic("positions");
    mapping.add_result_builder(scalar_at(3)).unwrap();
    assert_eq!(
        mapping.add_result_builder(scalar_at(3)).unwrap_err(),
        Error::DuplicateResultPosition(3)
    );

    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    assert_eq!(resolved.domain_results().len(), 1);
    assert_eq!(resolved.domain_results()[0].positions(), vec![2]);
}

#[test]
fn test_missing_column_is_reported() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default().with_column("ID", JdbcType::BigInt);

    let mut mapping = ResultSetMapping::dynamic("missing");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();

    assert_eq!(
        ctx.resolve(&mapping, &metadata).unwrap_err(),
        Error::ColumnNotFound("VERSION".into())
    );
}

// ============================================================================
// Duplicate alias validation
// ============================================================================

#[test]
fn test_duplicate_alias_between_scalars_fails() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("id", JdbcType::BigInt);

    let mut mapping = ResultSetMapping::dynamic("ids");
    mapping.add_result_builder(scalar_at(1)).unwrap();
    mapping.add_result_builder(scalar_at(2)).unwrap();

    assert_eq!(
        ctx.resolve(&mapping, &metadata).unwrap_err(),
        Error::NonUniqueDiscoveredSqlAlias { alias: "ID".into() }
    );
}

fn inheritance_metadata() -> ResultSetMetadata {
    ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("VERSION", JdbcType::Integer)
        .with_column("NAME", JdbcType::Varchar)
        .with_column("ID", JdbcType::BigInt)
        .with_column("SALARY", JdbcType::Double)
        .with_column("clazz_", JdbcType::Integer)
}

#[test]
fn test_polymorphic_entity_may_repeat_its_key_columns() {
    let ctx = TestContext::new(setup_inheritance_schema());

    let mut mapping = ResultSetMapping::dynamic("people");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();

    let resolved = ctx.resolve(&mapping, &inheritance_metadata()).unwrap();
    match &resolved.domain_results()[0] {
        DomainResult::Entity(person) => {
            assert_eq!(person.identifier.positions(), vec![0]);
            assert_eq!(person.discriminator.as_ref().map(|d| d.position), Some(5));
        }
        other => panic!("expected entity result, got {other:?}"),
    }
    assert_eq!(resolved.domain_results()[0].positions(), vec![0, 1, 2, 4, 5]);
}

#[test]
fn test_polymorphic_exemption_needs_a_lone_entity_result() {
    let ctx = TestContext::new(setup_inheritance_schema());

    let mut mapping = ResultSetMapping::dynamic("people");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();
    mapping.add_result_builder(scalar_at(4)).unwrap();

    assert_eq!(
        ctx.resolve(&mapping, &inheritance_metadata()).unwrap_err(),
        Error::NonUniqueDiscoveredSqlAlias { alias: "ID".into() }
    );
}

#[test]
fn test_polymorphic_entity_may_repeat_subclass_columns() {
    let ctx = TestContext::new(setup_salaried_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("NAME", JdbcType::Varchar)
        .with_column("SALARY", JdbcType::Double)
        .with_column("SALARY", JdbcType::Double)
        .with_column("clazz_", JdbcType::Integer);

    let mut mapping = ResultSetMapping::dynamic("people");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();

    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    assert_eq!(resolved.domain_results()[0].positions(), vec![0, 1, 2, 4]);
    assert_eq!(resolved.selections().len(), 4);

    // With a second result the repeated subclass column is an error again.
    mapping.add_result_builder(scalar("NAME")).unwrap();
    assert_eq!(
        ctx.resolve(&mapping, &metadata).unwrap_err(),
        Error::NonUniqueDiscoveredSqlAlias {
            alias: "SALARY".into()
        }
    );
}

#[test]
fn test_discriminator_alias_override() {
    let ctx = TestContext::new(setup_inheritance_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("VERSION", JdbcType::Integer)
        .with_column("NAME", JdbcType::Varchar)
        .with_column("SALARY", JdbcType::Double)
        .with_column("KIND", JdbcType::Integer);

    let mut mapping = ResultSetMapping::dynamic("people");
    mapping
        .add_result_builder(
            entity("p", "Person", &ctx.factory)
                .unwrap()
                .with_discriminator_alias("KIND"),
        )
        .unwrap();

    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    match &resolved.domain_results()[0] {
        DomainResult::Entity(person) => {
            assert_eq!(person.discriminator.as_ref().map(|d| d.position), Some(4));
        }
        other => panic!("expected entity result, got {other:?}"),
    }
}

// ============================================================================
// Fetch precedence
// ============================================================================

#[test]
fn test_fetch_builder_precedence() {
    let ctx = TestContext::new(setup_company_schema(FetchTiming::Delayed));
    let metadata = company_metadata();

    // Explicit builder wins over the legacy one.
    let mut mapping = ResultSetMapping::dynamic("explicit");
    mapping
        .add_result_builder(
            entity("p", "Person", &ctx.factory)
                .unwrap()
                .with_fetch("employer", joined_fetch("c")),
        )
        .unwrap();
    mapping.add_legacy_fetch_builder(legacy_fetch("c2", "p", "employer"));
    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "employer") {
        Fetch::EntityJoined(employer) => {
            assert_eq!(employer.table_alias, "c");
            assert_eq!(employer.identifier.positions(), vec![3]);
            assert_eq!(employer.fetches[0].positions(), vec![4]);
        }
        other => panic!("expected joined fetch, got {other:?}"),
    }

    // Legacy builder applies when no explicit builder exists.
    let mut mapping = ResultSetMapping::dynamic("legacy");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();
    mapping.add_legacy_fetch_builder(legacy_fetch("c2", "p", "employer"));
    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "employer") {
        Fetch::EntityJoined(employer) => assert_eq!(employer.table_alias, "c2"),
        other => panic!("expected joined fetch, got {other:?}"),
    }

    // Neither: the deferred association reads only its foreign key.
    let mut mapping = ResultSetMapping::dynamic("implicit");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();
    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "employer") {
        Fetch::EntityDelayed(employer) => {
            assert_eq!(employer.entity, "Company");
            assert_eq!(employer.key, vec![2]);
        }
        other => panic!("expected delayed fetch, got {other:?}"),
    }
    assert!(resolved
        .selections()
        .iter()
        .all(|selection| selection.values_array_position() < 3));
}

#[test]
fn test_immediate_association_is_selected() {
    let ctx = TestContext::new(setup_company_schema(FetchTiming::Immediate));
    let mut mapping = ResultSetMapping::dynamic("immediate");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();

    let resolved = ctx.resolve(&mapping, &company_metadata()).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "employer") {
        Fetch::EntitySelect(employer) => assert_eq!(employer.key, vec![2]),
        other => panic!("expected select fetch, got {other:?}"),
    }
}

#[test]
fn test_fetch_profile_makes_association_immediate() {
    let mut ctx = TestContext::new(setup_company_schema(FetchTiming::Delayed));
    ctx.influencers.enable_fetch_profile("with-employer");

    let mut mapping = ResultSetMapping::dynamic("profiled");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();

    let resolved = ctx.resolve(&mapping, &company_metadata()).unwrap();
    assert!(matches!(
        fetch_named(entity_fetches(&resolved.domain_results()[0]), "employer"),
        Fetch::EntitySelect(_)
    ));
}

#[test]
fn test_lock_mode_is_registered_per_alias() {
    let ctx = TestContext::new(setup_company_schema(FetchTiming::Delayed));
    let mut mapping = ResultSetMapping::dynamic("locked");
    mapping
        .add_result_builder(
            entity("p", "Person", &ctx.factory)
                .unwrap()
                .with_lock_mode(LockMode::PessimisticWrite),
        )
        .unwrap();

    let resolved = ctx.resolve(&mapping, &company_metadata()).unwrap();
    assert_eq!(
        resolved.determine_default_lock_mode("p", LockMode::None),
        LockMode::PessimisticWrite
    );
    assert_eq!(
        resolved.determine_default_lock_mode("c", LockMode::Read),
        LockMode::Read
    );
}

// ============================================================================
// Embeddables and collections
// ============================================================================

#[test]
fn test_embeddable_read_from_renamed_columns() {
    let address = EmbeddableDef::new(
        "Address",
        vec![
            AttributeDef::basic("street", "STREET", ScalarType::String),
            AttributeDef::basic("city", "CITY", ScalarType::String),
        ],
    );
    let customer = EntityDef::new("Customer", AttributeDef::basic("id", "ID", ScalarType::Int64))
        .with_attribute(AttributeDef::embedded("address", address));
    let ctx = TestContext::new(MappingMetamodel::new(1).with_entity(customer));
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("S", JdbcType::Varchar)
        .with_column("C", JdbcType::Varchar);

    let mut implicit = ResultSetMapping::dynamic("implicit");
    implicit
        .add_result_builder(entity("c", "Customer", &ctx.factory).unwrap())
        .unwrap();
    assert_eq!(
        ctx.resolve(&implicit, &metadata).unwrap_err(),
        Error::ColumnNotFound("STREET".into())
    );

    let mut renamed = ResultSetMapping::dynamic("renamed");
    renamed
        .add_result_builder(
            entity("c", "Customer", &ctx.factory)
                .unwrap()
                .with_fetch("address", fetch(vec!["S".into(), "C".into()])),
        )
        .unwrap();
    let resolved = ctx.resolve(&renamed, &metadata).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "address") {
        Fetch::Embeddable(address) => {
            assert_eq!(address.aggregate_position, None);
            assert_eq!(address.fetches.len(), 2);
            assert_eq!(address.fetches[0].positions(), vec![1]);
            assert_eq!(address.fetches[1].positions(), vec![2]);
        }
        other => panic!("expected embeddable fetch, got {other:?}"),
    }
}

#[test]
fn test_collection_join_and_default() {
    let ctx = TestContext::new(setup_order_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ORDER_ID", JdbcType::BigInt)
        .with_column("LINE_ORDER_ID", JdbcType::BigInt)
        .with_column("LINE_ID", JdbcType::BigInt)
        .with_column("PRODUCT", JdbcType::Varchar);

    let mut joined = ResultSetMapping::dynamic("joined");
    joined
        .add_result_builder(
            entity("o", "Order", &ctx.factory)
                .unwrap()
                .with_fetch("lines", joined_fetch("l")),
        )
        .unwrap();
    let resolved = ctx.resolve(&joined, &metadata).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "lines") {
        Fetch::Plural(lines) => {
            assert_eq!(lines.key, vec![1]);
            assert_eq!(lines.table_alias.as_deref(), Some("l"));
            match lines.element.as_deref() {
                Some(Fetch::EntityJoined(line)) => {
                    assert_eq!(line.entity, "OrderLine");
                    assert_eq!(line.identifier.positions(), vec![2]);
                    assert_eq!(line.fetches[0].positions(), vec![3]);
                }
                other => panic!("expected joined element, got {other:?}"),
            }
        }
        other => panic!("expected plural fetch, got {other:?}"),
    }

    let mut delayed = ResultSetMapping::dynamic("delayed");
    delayed
        .add_result_builder(entity("o", "Order", &ctx.factory).unwrap())
        .unwrap();
    let resolved = ctx.resolve(&delayed, &metadata).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "lines") {
        Fetch::Plural(lines) => {
            assert_eq!(lines.key, vec![1]);
            assert!(lines.element.is_none());
            assert!(lines.table_alias.is_none());
        }
        other => panic!("expected plural fetch, got {other:?}"),
    }
}

// ============================================================================
// Join chains
// ============================================================================

#[test]
fn test_circular_join_references_ancestor() {
    let ctx = TestContext::new(setup_node_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("PARENT_ID", JdbcType::BigInt);

    let mut mapping = ResultSetMapping::dynamic("nodes");
    mapping
        .add_result_builder(
            entity("n", "Node", &ctx.factory)
                .unwrap()
                .with_fetch("parent", joined_fetch("n")),
        )
        .unwrap();

    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "parent") {
        Fetch::Circular(parent) => {
            assert_eq!(parent.referenced_path.full_path(), "Node(n)");
            assert_eq!(parent.key, vec![1]);
        }
        other => panic!("expected circular fetch, got {other:?}"),
    }
}

#[test]
fn test_fetch_depth_is_limited() {
    let ctx = TestContext::with_config(
        setup_node_schema(),
        ResultsConfig::default().with_max_fetch_depth(1),
    );
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("PARENT_ID", JdbcType::BigInt);

    let mut mapping = ResultSetMapping::dynamic("deep");
    mapping
        .add_result_builder(entity("n", "Node", &ctx.factory).unwrap().with_fetch(
            "parent",
            joined_fetch("p1").with_fetch("parent", joined_fetch("p2")),
        ))
        .unwrap();

    assert!(matches!(
        ctx.resolve(&mapping, &metadata),
        Err(Error::FetchDepthExceeded {
            depth: 2,
            max_depth: 1,
            ..
        })
    ));
}

// ============================================================================
// Cache keys, named mappings and the resolved mapping cache
// ============================================================================

#[test]
fn test_cache_key_instance_is_an_independent_copy() {
    let mut mapping = ResultSetMapping::dynamic("adhoc");
    mapping.add_result_builder(scalar("NAME")).unwrap();

    let snapshot = mapping.cache_key_instance().into_owned();
    assert_eq!(snapshot, mapping);

    mapping.add_result_builder(scalar("AGE")).unwrap();
    assert_ne!(snapshot, mapping);
    assert_eq!(snapshot.number_of_result_builders(), 1);
}

#[test]
fn test_named_mapping_round_trip() {
    let base = SessionFactory::new(setup_company_schema(FetchTiming::Delayed));
    let mut named = ResultSetMapping::named("people-with-employer");
    named
        .add_result_builder(entity("p", "Person", &base).unwrap())
        .unwrap();
    named.add_legacy_fetch_builder(legacy_fetch("c", "p", "employer"));

    let factory = SessionFactory::new(setup_company_schema(FetchTiming::Delayed))
        .with_named_mapping(named.to_memento().unwrap());
    assert_eq!(factory.named_mapping_names(), vec!["people-with-employer"]);

    let mapping = ResultSetMapping::resolve_named("people-with-employer", &factory).unwrap();
    assert_eq!(mapping, named);
    let resolved = mapping
        .resolve(&company_metadata(), &LoadQueryInfluencers::default(), &factory)
        .unwrap();
    assert!(matches!(
        fetch_named(entity_fetches(&resolved.domain_results()[0]), "employer"),
        Fetch::EntityJoined(_)
    ));

    assert!(matches!(
        ResultSetMapping::resolve_named("unknown", &factory),
        Err(Error::IllegalArgument(_))
    ));
}

#[test]
fn test_resolved_mapping_cache() {
    let mut factory = SessionFactory::new(setup_company_schema(FetchTiming::Delayed));
    let influencers = LoadQueryInfluencers::default();
    let metadata = company_metadata();

    let mut mapping = ResultSetMapping::dynamic("cached");
    mapping
        .add_result_builder(entity("p", "Person", &factory).unwrap())
        .unwrap();

    let first = mapping.resolve_cached(&metadata, &influencers, &factory).unwrap();
    let second = mapping.resolve_cached(&metadata, &influencers, &factory).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.mapping_cache().len(), 1);

    let profiled = LoadQueryInfluencers::new().with_fetch_profile("with-employer");
    let third = mapping.resolve_cached(&metadata, &profiled, &factory).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(factory.mapping_cache().len(), 2);

    factory.update_metamodel(setup_company_schema(FetchTiming::Immediate));
    assert!(factory.mapping_cache().is_empty());
}

// ============================================================================
// Key fetchables and foreign key sides
// ============================================================================

fn passport_metadata() -> ResultSetMetadata {
    ResultSetMetadata::default()
        .with_column("OWNER_ID", JdbcType::BigInt)
        .with_column("NUMBER", JdbcType::Varchar)
        .with_column("ID", JdbcType::BigInt)
        .with_column("NAME", JdbcType::Varchar)
        .with_column("EMPLOYER_ID", JdbcType::BigInt)
}

#[test]
fn test_association_inside_identifier_reads_only_its_key() {
    let ctx = TestContext::new(setup_passport_schema(FetchTiming::Immediate));
    let mut mapping = ResultSetMapping::dynamic("passports");
    mapping
        .add_result_builder(entity("x", "Passport", &ctx.factory).unwrap())
        .unwrap();

    let resolved = ctx.resolve(&mapping, &passport_metadata()).unwrap();
    match &resolved.domain_results()[0] {
        DomainResult::Entity(passport) => {
            match passport.identifier.as_ref() {
                Fetch::EntityDelayed(owner) => {
                    assert_eq!(owner.entity, "Person");
                    assert_eq!(owner.key, vec![0]);
                }
                other => panic!("expected key-only owner, got {other:?}"),
            }
            assert_eq!(passport.fetches.len(), 1);
            assert_eq!(passport.fetches[0].positions(), vec![1]);
        }
        other => panic!("expected entity result, got {other:?}"),
    }
}

#[test]
fn test_joined_identifier_target_resolves_its_own_fetches() {
    let ctx = TestContext::new(setup_passport_schema(FetchTiming::Delayed));
    let mut mapping = ResultSetMapping::dynamic("passports");
    mapping
        .add_result_builder(
            entity("x", "Passport", &ctx.factory)
                .unwrap()
                .with_fetch("owner", joined_fetch("o")),
        )
        .unwrap();

    let resolved = ctx.resolve(&mapping, &passport_metadata()).unwrap();
    let passport = match &resolved.domain_results()[0] {
        DomainResult::Entity(passport) => passport,
        other => panic!("expected entity result, got {other:?}"),
    };
    let owner = match passport.identifier.as_ref() {
        Fetch::EntityJoined(owner) => owner,
        other => panic!("expected joined owner, got {other:?}"),
    };
    assert_eq!(owner.table_alias, "o");
    assert_eq!(owner.identifier.positions(), vec![2]);
    match fetch_named(&owner.fetches, "employer") {
        Fetch::EntitySelect(employer) => {
            assert_eq!(employer.path.full_path(), "Passport(x).owner.employer");
            assert_eq!(employer.key, vec![4]);
        }
        other => panic!("expected selected employer, got {other:?}"),
    }
}

#[test]
fn test_inverse_association_reads_owner_identifier() {
    let ctx = TestContext::new(setup_passport_schema(FetchTiming::Delayed));
    let metadata = ResultSetMetadata::default()
        .with_column("ID", JdbcType::BigInt)
        .with_column("NAME", JdbcType::Varchar)
        .with_column("EMPLOYER_ID", JdbcType::BigInt);

    let mut mapping = ResultSetMapping::dynamic("people");
    mapping
        .add_result_builder(entity("p", "Person", &ctx.factory).unwrap())
        .unwrap();

    let resolved = ctx.resolve(&mapping, &metadata).unwrap();
    match fetch_named(entity_fetches(&resolved.domain_results()[0]), "passport") {
        Fetch::EntityDelayed(passport) => {
            assert_eq!(passport.entity, "Passport");
            assert_eq!(passport.side, ForeignKeySide::Target);
            assert_eq!(passport.key, vec![0]);
        }
        other => panic!("expected key-only passport, got {other:?}"),
    }
    // The identifier column is shared, not selected twice.
    assert_eq!(resolved.selections().len(), 3);
}

// ============================================================================
// Instantiation arguments
// ============================================================================

#[test]
fn test_instantiation_arguments_must_name_their_columns() {
    let ctx = TestContext::new(setup_person_schema());
    let metadata = ResultSetMetadata::default()
        .with_column("A", JdbcType::Varchar)
        .with_column("B", JdbcType::Varchar);

    let mut unnamed = ResultSetMapping::dynamic("unnamed");
    unnamed
        .add_result_builder(instantiation(
            "Dto",
            vec![ScalarResultBuilder::default().into(), ScalarResultBuilder::default().into()],
        ))
        .unwrap();
    assert_eq!(
        ctx.resolve(&unnamed, &metadata).unwrap_err(),
        Error::PositionalSelectionDisallowed { result_position: 0 }
    );

    let mut positioned = ResultSetMapping::dynamic("positioned");
    positioned
        .add_result_builder(instantiation("Dto", vec![scalar_at(1).into(), scalar("B").into()]))
        .unwrap();
    let resolved = ctx.resolve(&positioned, &metadata).unwrap();
    assert_eq!(resolved.domain_results()[0].positions(), vec![0, 1]);
    assert_eq!(resolved.selections().len(), 2);
}
