//! Resolver behavior through the dispatcher, driven by in-memory fakes.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use gridbase_commons::models::attachment::{AttachmentInput, StoredAttachment};
use gridbase_commons::{
    AttachmentId, CellValue, Field, FieldId, FieldKind, RecordId, Table, TableId, TableRecord,
    UserId,
};
use gridbase_core::ports::LookupUser;
use gridbase_core::test_helpers::{
    InMemoryAttachmentLookup, InMemoryRecordStore, InMemoryTableRepository, InMemoryUserLookup,
};
use gridbase_core::{
    AttachmentValueResolverService, LinkTitleResolverService, RecordMutationSpecResolverService,
    RequestContext, SpecResolver, UserValueResolverService,
};
use gridbase_specs::{
    CellValueSpec, RecordSpec, SetLinkValueByTitleSpec, SetUnresolvedAttachmentValueSpec,
    SetUserValueByIdentifierSpec, UserIdentifiers, UserSelection,
};

fn stored_attachment(id: &str, token: &str) -> StoredAttachment {
    StoredAttachment {
        id: AttachmentId::new(id),
        token: token.to_string(),
        name: format!("{token}.png"),
        path: format!("/objects/{token}"),
        size: 512,
        mimetype: "image/png".to_string(),
        width: None,
        height: None,
    }
}

fn attachment_spec(field: &str, items: Option<Vec<AttachmentInput>>) -> CellValueSpec {
    CellValueSpec::UnresolvedAttachment(SetUnresolvedAttachmentValueSpec {
        field_id: FieldId::new(field),
        value: items,
    })
}

#[tokio::test]
async fn test_attachment_token_resolves_with_stored_metadata_and_fresh_id() {
    let lookup = Arc::new(InMemoryAttachmentLookup::with_stored(vec![
        stored_attachment("attstored000001", "tok1"),
    ]));
    let resolver = AttachmentValueResolverService::new(lookup.clone());
    let ctx = RequestContext::anonymous();

    let resolved = resolver
        .resolve_specs(
            &ctx,
            vec![attachment_spec(
                "fld1",
                Some(vec![AttachmentInput::by_token("tok1")]),
            )],
        )
        .await
        .unwrap();

    match &resolved[0] {
        CellValueSpec::Attachment(spec) => {
            let items = spec.value.as_ref().unwrap();
            assert_eq!(items[0].path, "/objects/tok1");
            assert_eq!(items[0].size, 512);
            assert_eq!(items[0].mimetype, "image/png");
            // Token matches get a fresh id, not the stored one.
            assert_ne!(items[0].id.as_str(), "attstored000001");
            assert!(items[0].id.as_str().starts_with("att"));
        }
        other => panic!("expected resolved attachment spec, got {:?}", other),
    }
}

#[tokio::test]
async fn test_attachment_id_match_preserves_id() {
    let lookup = Arc::new(InMemoryAttachmentLookup::with_stored(vec![
        stored_attachment("attkeep00000001", "tok1"),
    ]));
    let resolver = AttachmentValueResolverService::new(lookup);
    let ctx = RequestContext::anonymous();

    let resolved = resolver
        .resolve_specs(
            &ctx,
            vec![attachment_spec(
                "fld1",
                Some(vec![AttachmentInput::by_id(AttachmentId::new(
                    "attkeep00000001",
                ))]),
            )],
        )
        .await
        .unwrap();

    match &resolved[0] {
        CellValueSpec::Attachment(spec) => {
            assert_eq!(spec.value.as_ref().unwrap()[0].id.as_str(), "attkeep00000001");
        }
        other => panic!("expected resolved attachment spec, got {:?}", other),
    }
}

#[tokio::test]
async fn test_attachment_unknown_token_errors() {
    let lookup = Arc::new(InMemoryAttachmentLookup::default());
    let resolver = AttachmentValueResolverService::new(lookup);
    let ctx = RequestContext::anonymous();

    let err = resolver
        .resolve_specs(
            &ctx,
            vec![attachment_spec(
                "fld1",
                Some(vec![AttachmentInput::by_token("missing")]),
            )],
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, "validation.field.attachment_not_found");
}

#[tokio::test]
async fn test_attachment_item_without_reference_errors() {
    let lookup = Arc::new(InMemoryAttachmentLookup::default());
    let resolver = AttachmentValueResolverService::new(lookup);
    let ctx = RequestContext::anonymous();

    let malformed = AttachmentInput {
        id: None,
        token: None,
        name: Some("orphan.bin".to_string()),
    };
    let err = resolver
        .resolve_specs(&ctx, vec![attachment_spec("fld1", Some(vec![malformed]))])
        .await
        .unwrap_err();
    assert_eq!(err.code, "validation.field.invalid_attachment_format");
}

#[tokio::test]
async fn test_null_attachment_round_trips_to_null() {
    let lookup = Arc::new(InMemoryAttachmentLookup::default());
    let resolver = AttachmentValueResolverService::new(lookup.clone());
    let ctx = RequestContext::anonymous();

    let resolved = resolver
        .resolve_specs(&ctx, vec![attachment_spec("fld1", None)])
        .await
        .unwrap();
    match &resolved[0] {
        CellValueSpec::Attachment(spec) => assert!(spec.value.is_none()),
        other => panic!("expected resolved attachment spec, got {:?}", other),
    }
    // Nothing to look up for a null value.
    assert_eq!(lookup.token_calls.load(Ordering::SeqCst), 0);
    assert_eq!(lookup.id_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_one_token_lookup_for_many_specs() {
    let lookup = Arc::new(InMemoryAttachmentLookup::with_stored(vec![
        stored_attachment("attstored000001", "tok1"),
        stored_attachment("attstored000002", "tok2"),
    ]));
    let resolver = AttachmentValueResolverService::new(lookup.clone());
    let ctx = RequestContext::anonymous();

    let specs = vec![
        attachment_spec("fld1", Some(vec![AttachmentInput::by_token("tok1")])),
        attachment_spec("fld2", Some(vec![AttachmentInput::by_token("tok2")])),
        attachment_spec("fld3", Some(vec![AttachmentInput::by_token("tok1")])),
    ];
    resolver.resolve_specs(&ctx, specs).await.unwrap();
    assert_eq!(lookup.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(lookup.id_calls.load(Ordering::SeqCst), 0);
}

fn user_spec(field: &str, identifiers: Option<UserIdentifiers>) -> CellValueSpec {
    CellValueSpec::UserByIdentifier(SetUserValueByIdentifierSpec {
        field_id: FieldId::new(field),
        identifiers,
    })
}

fn user(id: &str, name: &str, email: &str) -> LookupUser {
    LookupUser {
        id: UserId::new(id),
        name: name.to_string(),
        email: Some(email.to_string()),
    }
}

#[tokio::test]
async fn test_user_identifiers_merge_into_one_lookup() {
    let lookup = Arc::new(InMemoryUserLookup::with_users(vec![
        user("usr1", "Ada", "ada@example.com"),
        user("usr2", "Grace", "grace@example.com"),
    ]));
    let resolver = UserValueResolverService::new(lookup.clone());
    let ctx = RequestContext::anonymous();

    let resolved = resolver
        .resolve_specs(
            &ctx,
            vec![
                user_spec("fld1", Some(UserIdentifiers::Single("usr1".to_string()))),
                user_spec(
                    "fld2",
                    Some(UserIdentifiers::Multiple(vec![
                        "grace@example.com".to_string(),
                        "Ada".to_string(),
                    ])),
                ),
            ],
        )
        .await
        .unwrap();

    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    match &resolved[0] {
        CellValueSpec::User(spec) => match spec.value.as_ref().unwrap() {
            UserSelection::Single(item) => assert_eq!(item.id.as_str(), "usr1"),
            other => panic!("expected single selection, got {:?}", other),
        },
        other => panic!("expected resolved user spec, got {:?}", other),
    }
    match &resolved[1] {
        CellValueSpec::User(spec) => match spec.value.as_ref().unwrap() {
            UserSelection::Multiple(items) => {
                assert_eq!(items[0].id.as_str(), "usr2");
                assert_eq!(items[1].id.as_str(), "usr1");
            }
            other => panic!("expected multiple selection, got {:?}", other),
        },
        other => panic!("expected resolved user spec, got {:?}", other),
    }
}

#[tokio::test]
async fn test_me_resolves_to_actor() {
    let lookup = Arc::new(InMemoryUserLookup::with_users(vec![user(
        "usr9",
        "Actor",
        "actor@example.com",
    )]));
    let resolver = UserValueResolverService::new(lookup);
    let ctx = RequestContext::for_actor(UserId::new("usr9"));

    let resolved = resolver
        .resolve_specs(
            &ctx,
            vec![user_spec("fld1", Some(UserIdentifiers::Single("me".to_string())))],
        )
        .await
        .unwrap();
    match &resolved[0] {
        CellValueSpec::User(spec) => match spec.value.as_ref().unwrap() {
            UserSelection::Single(item) => assert_eq!(item.id.as_str(), "usr9"),
            other => panic!("expected single selection, got {:?}", other),
        },
        other => panic!("expected resolved user spec, got {:?}", other),
    }
}

#[tokio::test]
async fn test_me_without_actor_is_unauthorized() {
    let lookup = Arc::new(InMemoryUserLookup::default());
    let resolver = UserValueResolverService::new(lookup);
    let ctx = RequestContext::anonymous();

    let err = resolver
        .resolve_specs(
            &ctx,
            vec![user_spec("fld1", Some(UserIdentifiers::Single("me".to_string())))],
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, "unauthorized.missing_actor");
}

#[tokio::test]
async fn test_unknown_user_identifier_errors() {
    let lookup = Arc::new(InMemoryUserLookup::default());
    let resolver = UserValueResolverService::new(lookup);
    let ctx = RequestContext::anonymous();

    let err = resolver
        .resolve_specs(
            &ctx,
            vec![user_spec(
                "fld1",
                Some(UserIdentifiers::Single("ghost@example.com".to_string())),
            )],
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, "validation.field.user_not_found");
}

fn link_fixture() -> (Arc<InMemoryTableRepository>, Arc<InMemoryRecordStore>) {
    let foreign_table = Table::new(
        TableId::new("tbl_projects"),
        "Projects",
        vec![Field::new(
            FieldId::new("fld_title"),
            "Title",
            FieldKind::SingleLineText,
        )],
        FieldId::new("fld_title"),
    );
    let records = vec![
        TableRecord::new(RecordId::new("rec1")).set_field_value(
            FieldId::new("fld_title"),
            CellValue::Text("Apollo".to_string()),
        ),
        TableRecord::new(RecordId::new("rec2")).set_field_value(
            FieldId::new("fld_title"),
            CellValue::Text("Gemini".to_string()),
        ),
        // Duplicate title; the first match must win.
        TableRecord::new(RecordId::new("rec3")).set_field_value(
            FieldId::new("fld_title"),
            CellValue::Text("Apollo".to_string()),
        ),
    ];
    let tables = Arc::new(InMemoryTableRepository::with_tables(vec![foreign_table]));
    let store = Arc::new(InMemoryRecordStore::with_records(
        TableId::new("tbl_projects"),
        records,
    ));
    (tables, store)
}

fn link_spec(titles: Option<Vec<&str>>, multiple: bool) -> CellValueSpec {
    CellValueSpec::LinkByTitle(SetLinkValueByTitleSpec {
        field_id: FieldId::new("fld_link"),
        foreign_table_id: TableId::new("tbl_projects"),
        titles: titles.map(|t| t.into_iter().map(str::to_string).collect()),
        multiple,
    })
}

#[tokio::test]
async fn test_link_titles_resolve_first_match_and_drop_unmatched() {
    let (tables, store) = link_fixture();
    let resolver = LinkTitleResolverService::new(tables, store.clone());
    let ctx = RequestContext::anonymous();

    let resolved = resolver
        .resolve_specs(
            &ctx,
            vec![link_spec(Some(vec!["Apollo", "Nonexistent", "Gemini"]), true)],
        )
        .await
        .unwrap();

    match &resolved[0] {
        CellValueSpec::Link(spec) => {
            let items = spec.value.as_ref().unwrap();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].record_id.as_str(), "rec1");
            assert_eq!(items[1].record_id.as_str(), "rec2");
        }
        other => panic!("expected resolved link spec, got {:?}", other),
    }
    // All foreign records streamed exactly once.
    assert_eq!(store.stream_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_link_title_non_text_primary_is_rejected() {
    let foreign_table = Table::new(
        TableId::new("tbl_projects"),
        "Projects",
        vec![Field::new(FieldId::new("fld_n"), "N", FieldKind::Number)],
        FieldId::new("fld_n"),
    );
    let tables = Arc::new(InMemoryTableRepository::with_tables(vec![foreign_table]));
    let store = Arc::new(InMemoryRecordStore::default());
    let resolver = LinkTitleResolverService::new(tables, store);
    let ctx = RequestContext::anonymous();

    let err = resolver
        .resolve_specs(&ctx, vec![link_spec(Some(vec!["Apollo"]), false)])
        .await
        .unwrap_err();
    assert_eq!(err.code, "validation.link.title_field_not_text");
}

#[tokio::test]
async fn test_dispatcher_batches_across_trees_with_one_lookup() {
    let (tables, store) = link_fixture();
    let user_lookup = Arc::new(InMemoryUserLookup::with_users(vec![user(
        "usr1",
        "Ada",
        "ada@example.com",
    )]));
    let dispatcher = RecordMutationSpecResolverService::new(vec![
        Arc::new(LinkTitleResolverService::new(tables, store.clone())),
        Arc::new(UserValueResolverService::new(user_lookup.clone())),
    ]);
    let ctx = RequestContext::anonymous();

    // Two trees, each with one link leaf and one user leaf.
    let trees = vec![
        RecordSpec::and(
            RecordSpec::Value(link_spec(Some(vec!["Apollo"]), false)),
            RecordSpec::Value(user_spec(
                "fld_u",
                Some(UserIdentifiers::Single("usr1".to_string())),
            )),
        ),
        RecordSpec::and(
            RecordSpec::Value(link_spec(Some(vec!["Gemini"]), false)),
            RecordSpec::Value(user_spec(
                "fld_u",
                Some(UserIdentifiers::Single("ada@example.com".to_string())),
            )),
        ),
    ];
    let resolved = dispatcher.resolve_and_replace_many(&ctx, trees).await.unwrap();

    // One lookup per resolver, not per tree.
    assert_eq!(store.stream_calls.load(Ordering::SeqCst), 1);
    assert_eq!(user_lookup.calls.load(Ordering::SeqCst), 1);

    // Shape preserved, every leaf resolved.
    for tree in &resolved {
        let leaves = tree.value_leaves();
        assert_eq!(leaves.len(), 2);
        assert!(leaves.iter().all(|leaf| !leaf.is_unresolved()));
    }
}
