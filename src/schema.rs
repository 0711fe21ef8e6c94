diesel::table! {
    organizations (id) {
        id -> Text,
        name -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    organization_members (organization_id, user_id) {
        organization_id -> Text,
        user_id -> Text,
        role -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    documents (id) {
        id -> Text,
        organization_id -> Text,
        name -> Text,
        original_name -> Text,
        mime_type -> Text,
        size -> BigInt,
        storage_key -> Text,
        content -> Text,
        created_by -> Nullable<Text>,
        is_deleted -> Bool,
        deleted_at -> Nullable<Timestamp>,
        deleted_by -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    tags (id) {
        id -> Text,
        organization_id -> Text,
        name -> Text,
        color -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    document_tags (document_id, tag_id) {
        document_id -> Text,
        tag_id -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    tagging_rules (id) {
        id -> Text,
        organization_id -> Text,
        name -> Text,
        description -> Nullable<Text>,
        enabled -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    tagging_rule_conditions (id) {
        id -> Text,
        rule_id -> Text,
        field -> Text,
        operator -> Text,
        value -> Text,
        is_case_sensitive -> Bool,
        position -> Integer,
    }
}

diesel::table! {
    tagging_rule_actions (id) {
        id -> Text,
        rule_id -> Text,
        tag_id -> Text,
    }
}

diesel::table! {
    intake_emails (id) {
        id -> Text,
        organization_id -> Text,
        email_address -> Text,
        is_enabled -> Bool,
        allowed_origins -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(organization_members -> organizations (organization_id));
diesel::joinable!(documents -> organizations (organization_id));
diesel::joinable!(tags -> organizations (organization_id));
diesel::joinable!(document_tags -> documents (document_id));
diesel::joinable!(document_tags -> tags (tag_id));
diesel::joinable!(tagging_rules -> organizations (organization_id));
diesel::joinable!(tagging_rule_conditions -> tagging_rules (rule_id));
diesel::joinable!(tagging_rule_actions -> tagging_rules (rule_id));
diesel::joinable!(tagging_rule_actions -> tags (tag_id));
diesel::joinable!(intake_emails -> organizations (organization_id));

diesel::allow_tables_to_appear_in_same_query!(
    organizations,
    organization_members,
    documents,
    tags,
    document_tags,
    tagging_rules,
    tagging_rule_conditions,
    tagging_rule_actions,
    intake_emails,
);
