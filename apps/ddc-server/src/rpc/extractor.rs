//! `Extractor.*` handlers

use crate::session::{ExtractorSession, SessionError, SessionState};
use crate::state::AppState;

use super::types::{
    AppendDdcPartArgs, EmptyReply, GetPartArgs, NoArgs, ParseReply, PartReply, RegisterReply,
    SessionArgs, SignatureReply,
};
use super::{part_size, record_session, respond};

pub async fn register(state: &AppState, _args: NoArgs) -> RegisterReply {
    let id = state
        .sessions()
        .create(SessionState::Extractor(ExtractorSession::new()))
        .await;
    record_session(&id);

    RegisterReply {
        id,
        error: String::new(),
    }
}

pub async fn append_ddc_part(state: &AppState, args: AppendDdcPartArgs) -> EmptyReply {
    record_session(&args.id);
    respond(
        async {
            let mut guard = state.sessions().lock(&args.id).await?;
            guard.extractor_mut()?.append_ddc_part(&args.part)?;
            Ok::<_, SessionError>(EmptyReply::default())
        }
        .await,
    )
}

pub async fn parse(state: &AppState, args: SessionArgs) -> ParseReply {
    record_session(&args.id);
    respond(
        async {
            let mut guard = state.sessions().lock(&args.id).await?;
            let document_file_name = guard
                .extractor_mut()?
                .parse(state.scanner(), state.extractor())
                .await?;
            Ok::<_, SessionError>(ParseReply {
                document_file_name,
                error: String::new(),
            })
        }
        .await,
    )
}

pub async fn get_document_part(state: &AppState, args: GetPartArgs) -> PartReply {
    record_session(&args.id);
    respond(
        async {
            let max = part_size(args.max_part_size)?;
            let mut guard = state.sessions().lock(&args.id).await?;
            let (part, is_final) = guard
                .extractor_mut()?
                .get_document_part(max, args.rewind)?;
            Ok::<_, SessionError>(PartReply {
                part,
                is_final,
                error: String::new(),
            })
        }
        .await,
    )
}

pub async fn get_signature(state: &AppState, args: SessionArgs) -> SignatureReply {
    record_session(&args.id);
    respond(
        async {
            let mut guard = state.sessions().lock(&args.id).await?;
            let (signature, is_final) = guard.extractor_mut()?.get_signature()?;
            Ok::<_, SessionError>(SignatureReply {
                signature,
                is_final,
                error: String::new(),
            })
        }
        .await,
    )
}
