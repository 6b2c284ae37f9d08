//! `Builder.*` handlers

use crate::ddc::{BuildOptions, DocumentInfo};
use crate::session::{BuilderSession, SessionError, SessionState};
use crate::state::AppState;

use super::types::{
    AppendDocumentPartArgs, AppendSignatureArgs, BuildArgs, BuilderRegisterArgs, EmptyReply,
    GetPartArgs, PartReply, RegisterReply,
};
use super::{part_size, record_session, respond};

pub async fn register(state: &AppState, args: BuilderRegisterArgs) -> RegisterReply {
    let info = DocumentInfo {
        title: args.title,
        description: args.description,
        id: args.id,
        id_qr_code: args.id_qr_code,
        language: args.language,
        ..Default::default()
    };
    let session = BuilderSession::new(info, args.file_name);
    let id = state.sessions().create(SessionState::Builder(session)).await;
    record_session(&id);

    RegisterReply {
        id,
        error: String::new(),
    }
}

pub async fn append_document_part(state: &AppState, args: AppendDocumentPartArgs) -> EmptyReply {
    record_session(&args.id);
    respond(
        async {
            let mut guard = state.sessions().lock(&args.id).await?;
            guard.builder_mut()?.append_document_part(&args.bytes)?;
            Ok::<_, SessionError>(EmptyReply::default())
        }
        .await,
    )
}

pub async fn append_signature(state: &AppState, args: AppendSignatureArgs) -> EmptyReply {
    record_session(&args.id);
    respond(
        async {
            let mut guard = state.sessions().lock(&args.id).await?;
            guard
                .builder_mut()?
                .append_signature(args.signature_info, state.scanner())
                .await?;
            Ok::<_, SessionError>(EmptyReply::default())
        }
        .await,
    )
}

pub async fn build(state: &AppState, args: BuildArgs) -> EmptyReply {
    record_session(&args.id);
    let options = BuildOptions {
        creation_date: args.creation_date,
        builder_name: args.builder_name,
        how_to_verify: args.how_to_verify,
        visualize_document: !args.without_document_visualization,
        visualize_signatures: !args.without_signatures_visualization,
    };

    respond(
        async {
            let mut guard = state.sessions().lock(&args.id).await?;
            guard
                .builder_mut()?
                .build(options, state.scanner(), state.renderer())
                .await?;
            Ok::<_, SessionError>(EmptyReply::default())
        }
        .await,
    )
}

pub async fn get_ddc_part(state: &AppState, args: GetPartArgs) -> PartReply {
    record_session(&args.id);
    respond(
        async {
            let max = part_size(args.max_part_size)?;
            let mut guard = state.sessions().lock(&args.id).await?;
            let (part, is_final) = guard.builder_mut()?.get_ddc_part(max)?;
            Ok::<_, SessionError>(PartReply {
                part,
                is_final,
                error: String::new(),
            })
        }
        .await,
    )
}
